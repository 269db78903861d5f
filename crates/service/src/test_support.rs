#![cfg(test)]
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

use configs::AppConfig;
use models::db::connect_with_config;

// Migrations run once per test process; false means no database is reachable
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::load_and_validate().unwrap_or_default();
    cfg.database.max_connections = cfg.database.max_connections.max(10);
    cfg.database.min_connections = cfg.database.min_connections.min(1);
    cfg.database.acquire_timeout_secs = 10;
    cfg
}

/// Migrated connection, or `None` when DB tests are skipped or the database is down.
pub async fn get_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let cfg = test_config();
    let ready = *MIGRATED
        .get_or_init(|| async {
            match connect_with_config(&cfg.database).await {
                Ok(db) => migration::Migrator::up(&db, None).await.is_ok(),
                Err(_) => false,
            }
        })
        .await;
    if !ready {
        return None;
    }
    connect_with_config(&cfg.database).await.ok()
}

/// Positive ID unlikely to collide between test runs.
pub fn fresh_id() -> u64 {
    ((uuid::Uuid::new_v4().as_u128() >> 66) as u64).max(1)
}

mod seaorm_store_tests {
    use std::sync::Arc;

    use super::*;
    use crate::compose::access::AllowAll;
    use crate::compose::domain::{Chart, ChartFilter};
    use crate::compose::ChartService;
    use crate::context::Context;
    use crate::errors::ServiceError;
    use crate::store::seaorm::SeaOrmStore;
    use crate::store::{ChartRepository, ComposeStore, StoreError};

    async fn seeded(db: &DatabaseConnection) -> u64 {
        let ns_id = fresh_id();
        models::namespace::create(db, ns_id as i64, "Tests", &format!("t{}", ns_id))
            .await
            .expect("create namespace");
        ns_id
    }

    #[tokio::test]
    async fn chart_lifecycle_against_postgres() {
        let Some(db) = get_db().await else { return };
        let ns_id = seeded(&db).await;
        let svc = ChartService::new(Arc::new(SeaOrmStore::new(db)), Arc::new(AllowAll));
        let ctx = Context::new(1);

        let c = svc
            .create(&ctx, Chart { namespace_id: ns_id, handle: "sales".into(), name: "Sales".into(), ..Chart::default() })
            .await
            .expect("create");
        let dup = svc
            .create(&ctx, Chart { namespace_id: ns_id, handle: "SALES".into(), ..Chart::default() })
            .await;
        assert!(matches!(dup, Err(ServiceError::HandleNotUnique)));

        let found = svc.find_by_handle(&ctx, ns_id, "Sales").await.expect("find by handle");
        assert_eq!(found.id, c.id);

        svc.delete_by_id(&ctx, ns_id, c.id).await.expect("delete");
        let (set, _) = svc.find(&ctx, ChartFilter::for_namespace(ns_id)).await.expect("find");
        assert!(set.is_empty());

        svc.undelete_by_id(&ctx, ns_id, c.id).await.expect("undelete");
        let (set, _) = svc.find(&ctx, ChartFilter::for_namespace(ns_id)).await.expect("find");
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn handle_index_violation_maps_to_handle_taken() {
        let Some(db) = get_db().await else { return };
        let ns_id = seeded(&db).await;
        let store = SeaOrmStore::new(db);
        let repo = store.repository();
        let chart = |id: u64, handle: &str| Chart {
            id,
            namespace_id: ns_id,
            handle: handle.into(),
            created_at: chrono::Utc::now(),
            ..Chart::default()
        };

        // writes that skip the service check, as a concurrent writer would
        repo.create_chart(&chart(fresh_id(), "sales")).await.expect("first insert");
        let clash = repo.create_chart(&chart(fresh_id(), "Sales")).await;
        assert!(matches!(clash, Err(StoreError::HandleTaken)));

        let other = chart(fresh_id(), "pipeline");
        repo.create_chart(&other).await.expect("other insert");
        let clash = repo.update_chart(&Chart { handle: "SALES".into(), ..other }).await;
        assert!(matches!(clash, Err(StoreError::HandleTaken)));
    }
}
