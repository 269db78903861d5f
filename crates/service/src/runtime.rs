//! Runtime wiring: builds a database-backed chart service from the
//! application config.

use std::sync::Arc;

use configs::AppConfig;
use tracing::info;

use crate::actionlog::{ActionRecorder, Policy, SeaOrmRecorder, TracingRecorder};
use crate::compose::{ChartAccessController, ChartService};
use crate::locale::Locale;
use crate::store::seaorm::SeaOrmStore;

/// Connects to the configured database and assembles the chart service.
/// Action records go to the `actionlog` table when enabled, to tracing otherwise.
pub async fn chart_service(
    cfg: &AppConfig,
    ac: Arc<dyn ChartAccessController>,
) -> anyhow::Result<ChartService<SeaOrmStore>> {
    let db = models::db::connect_with_config(&cfg.database).await?;

    let actionlog: Arc<dyn ActionRecorder> = if cfg.actionlog.enabled {
        Arc::new(SeaOrmRecorder::new(db.clone(), Policy::from(&cfg.actionlog)))
    } else {
        Arc::new(TracingRecorder)
    };

    info!(
        locale = cfg.locale.enabled,
        default_language = %cfg.locale.default_language,
        actionlog = cfg.actionlog.enabled,
        "chart_service_ready"
    );

    Ok(ChartService::new(Arc::new(SeaOrmStore::new(db)), ac)
        .with_actionlog(actionlog)
        .with_locale(Locale::new(&cfg.locale)))
}
