//! Store abstractions for the compose service layer.
//!
//! A store hands out a non-transactional repository for reads and opens
//! transactions for writes; both expose the same repository traits.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::compose::domain::{Chart, ChartFilter, Namespace};
use crate::errors::ServiceError;
use crate::label::Labels;
use crate::locale::ResourceTranslation;

pub mod memory;
pub mod seaorm;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("ID {0} out of storable range")]
    IdRange(u64),
    /// Another live chart in the namespace holds the handle.
    #[error("chart handle already taken")]
    HandleTaken,
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self { StoreError::Db(e.to_string()) }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self { StoreError::Serialization(e.to_string()) }
}

#[async_trait]
pub trait NamespaceRepository: Send + Sync {
    async fn lookup_namespace_by_id(&self, id: u64) -> Result<Option<Namespace>, StoreError>;
}

#[async_trait]
pub trait ChartRepository: Send + Sync {
    /// Charts matching `filter`; labels are not hydrated.
    async fn search_charts(&self, filter: &ChartFilter) -> Result<Vec<Chart>, StoreError>;
    async fn lookup_chart_by_id(&self, id: u64) -> Result<Option<Chart>, StoreError>;
    /// Case-insensitive handle match among charts that are not deleted.
    async fn lookup_chart_by_namespace_id_handle(&self, namespace_id: u64, handle: &str) -> Result<Option<Chart>, StoreError>;
    async fn create_chart(&self, chart: &Chart) -> Result<(), StoreError>;
    async fn update_chart(&self, chart: &Chart) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LabelRepository: Send + Sync {
    async fn search_labeled_resources(&self, kind: &str, labels: &Labels, ids: &[u64]) -> Result<Vec<u64>, StoreError>;
    async fn load_labels(&self, kind: &str, ids: &[u64]) -> Result<HashMap<u64, Labels>, StoreError>;
    async fn replace_labels(&self, kind: &str, id: u64, labels: &Labels) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TranslationRepository: Send + Sync {
    async fn resource_translations(&self, lang: &str, resource: &str) -> Result<Vec<ResourceTranslation>, StoreError>;
    async fn upsert_resource_translations(&self, tt: &[ResourceTranslation]) -> Result<(), StoreError>;
}

pub trait ComposeRepository: NamespaceRepository + ChartRepository + LabelRepository + TranslationRepository {}

impl<T> ComposeRepository for T where T: NamespaceRepository + ChartRepository + LabelRepository + TranslationRepository {}

#[async_trait]
pub trait Transaction: ComposeRepository + Sized {
    async fn commit(self) -> Result<(), StoreError>;
    async fn rollback(self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ComposeStore: Send + Sync {
    type Repo: ComposeRepository;
    type Tx: Transaction;

    fn repository(&self) -> &Self::Repo;
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Commits on success and rolls back on failure. The operation's own error
/// wins over a failed rollback.
pub async fn finish<T, V>(tx: T, res: Result<V, ServiceError>) -> Result<V, ServiceError>
where
    T: Transaction,
{
    match res {
        Ok(v) => {
            tx.commit().await?;
            Ok(v)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                warn!(error = %rb, "rollback_failed");
            }
            Err(e)
        }
    }
}
