//! Action recorder: one audit record per attempted service action.
//!
//! Recording never fails the caller; persistence problems are reported
//! through tracing only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::seaorm::db_id;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub actor_id: u64,
    pub resource: String,
    pub action: &'static str,
    pub error: Option<String>,
    pub severity: Severity,
    pub description: String,
    pub meta: Map<String, Value>,
}

#[async_trait]
pub trait ActionRecorder: Send + Sync {
    async fn record(&self, action: Action);
}

/// Which records get persisted.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub enabled: bool,
    /// Also keep successful records below notice level (reads).
    pub debug: bool,
}

impl Default for Policy {
    fn default() -> Self { Self { enabled: true, debug: false } }
}

impl From<&configs::ActionlogConfig> for Policy {
    fn from(cfg: &configs::ActionlogConfig) -> Self { Self { enabled: cfg.enabled, debug: cfg.debug } }
}

impl Policy {
    pub fn allows(&self, a: &Action) -> bool {
        self.enabled && (self.debug || a.error.is_some() || a.severity <= Severity::Notice)
    }
}

/// Emits records as structured tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

#[async_trait]
impl ActionRecorder for TracingRecorder {
    async fn record(&self, a: Action) {
        match &a.error {
            Some(err) => warn!(
                request_id = %a.request_id,
                actor_id = a.actor_id,
                resource = %a.resource,
                action = a.action,
                error = %err,
                "{}", a.description
            ),
            None if a.severity <= Severity::Notice => info!(
                request_id = %a.request_id,
                actor_id = a.actor_id,
                resource = %a.resource,
                action = a.action,
                "{}", a.description
            ),
            None => debug!(
                request_id = %a.request_id,
                actor_id = a.actor_id,
                resource = %a.resource,
                action = a.action,
                "{}", a.description
            ),
        }
    }
}

fn to_active(a: &Action) -> Result<models::actionlog::ActiveModel, StoreError> {
    Ok(models::actionlog::ActiveModel {
        ts: Set(a.timestamp.into()),
        request_id: Set(a.request_id),
        actor_id: Set(db_id(a.actor_id)?),
        resource: Set(a.resource.clone()),
        action: Set(a.action.to_string()),
        error: Set(a.error.clone()),
        severity: Set(a.severity as i16),
        description: Set(a.description.clone()),
        meta: Set(Value::Object(a.meta.clone())),
        ..Default::default()
    })
}

/// Persists records into the `actionlog` table.
pub struct SeaOrmRecorder {
    pub db: DatabaseConnection,
    pub policy: Policy,
}

impl SeaOrmRecorder {
    pub fn new(db: DatabaseConnection, policy: Policy) -> Self { Self { db, policy } }
}

#[async_trait]
impl ActionRecorder for SeaOrmRecorder {
    async fn record(&self, a: Action) {
        if !self.policy.allows(&a) {
            return;
        }
        let am = match to_active(&a) {
            Ok(am) => am,
            Err(e) => {
                warn!(error = %e, resource = %a.resource, action = a.action, "actionlog_record_rejected");
                return;
            }
        };
        if let Err(e) = am.insert(&self.db).await {
            warn!(error = %e, resource = %a.resource, action = a.action, "actionlog_write_failed");
        }
    }
}

/// In-memory recorder for tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryRecorder {
        actions: Mutex<Vec<Action>>,
    }

    impl MemoryRecorder {
        pub fn actions(&self) -> Vec<Action> {
            self.actions.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        pub fn last(&self) -> Option<Action> { self.actions().pop() }
    }

    #[async_trait]
    impl ActionRecorder for MemoryRecorder {
        async fn record(&self, action: Action) {
            self.actions.lock().unwrap_or_else(|e| e.into_inner()).push(action);
        }
    }
}
