//! Entity loaders shared by the chart verbs.
//!
//! A chart found in another namespace is reported exactly like a missing one.

use super::domain::{Chart, Namespace};
use crate::errors::ServiceError;
use crate::handle;
use crate::store::{ChartRepository, NamespaceRepository};

pub async fn load_namespace<R>(repo: &R, namespace_id: u64) -> Result<Namespace, ServiceError>
where
    R: NamespaceRepository + ?Sized,
{
    if namespace_id == 0 {
        return Err(ServiceError::InvalidId);
    }
    repo.lookup_namespace_by_id(namespace_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("namespace"))
}

pub async fn load_chart<R>(repo: &R, namespace_id: u64, chart_id: u64) -> Result<Chart, ServiceError>
where
    R: ChartRepository + ?Sized,
{
    if chart_id == 0 || namespace_id == 0 {
        return Err(ServiceError::InvalidId);
    }
    match repo.lookup_chart_by_id(chart_id).await? {
        Some(c) if c.namespace_id == namespace_id => Ok(c),
        _ => Err(ServiceError::not_found("chart")),
    }
}

/// Handle syntax is checked before the store is queried; an empty handle
/// never identifies a chart.
pub async fn load_chart_by_handle<R>(repo: &R, namespace_id: u64, h: &str) -> Result<Chart, ServiceError>
where
    R: ChartRepository + ?Sized,
{
    if namespace_id == 0 {
        return Err(ServiceError::InvalidId);
    }
    if h.is_empty() || !handle::is_valid(h) {
        return Err(ServiceError::InvalidHandle);
    }
    repo.lookup_chart_by_namespace_id_handle(namespace_id, h)
        .await?
        .ok_or_else(|| ServiceError::not_found("chart"))
}

pub async fn load_chart_combo<R>(repo: &R, namespace_id: u64, chart_id: u64) -> Result<(Namespace, Chart), ServiceError>
where
    R: NamespaceRepository + ChartRepository + ?Sized,
{
    let ns = load_namespace(repo, namespace_id).await?;
    let c = load_chart(repo, namespace_id, chart_id).await?;
    Ok((ns, c))
}

/// Fails when another live chart in the namespace already uses `handle`.
pub async fn unique_check<R>(repo: &R, namespace_id: u64, chart_id: u64, handle: &str) -> Result<(), ServiceError>
where
    R: ChartRepository + ?Sized,
{
    if handle.is_empty() {
        return Ok(());
    }
    match repo.lookup_chart_by_namespace_id_handle(namespace_id, handle).await? {
        Some(existing) if existing.id != chart_id => Err(ServiceError::HandleNotUnique),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::store::memory::MemoryStore;
    use crate::store::ComposeStore;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_namespace(Namespace { id: 1, name: "CRM".into(), slug: "crm".into(), enabled: true, ..Namespace::default() });
        store.add_namespace(Namespace { id: 2, name: "HR".into(), slug: "hr".into(), enabled: true, ..Namespace::default() });
        store
    }

    #[tokio::test]
    async fn zero_ids_are_invalid() {
        let store = seeded();
        let repo = store.repository();
        assert_eq!(load_namespace(repo, 0).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(load_chart(repo, 0, 5).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(load_chart(repo, 1, 0).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(load_chart_by_handle(repo, 0, "sales").await.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn cross_namespace_is_not_found() {
        let store = seeded();
        let repo = store.repository();
        repo.create_chart(&Chart { id: 10, namespace_id: 2, handle: "sales".into(), ..Chart::default() })
            .await
            .unwrap();

        assert!(load_chart(repo, 2, 10).await.is_ok());
        assert!(matches!(load_chart(repo, 1, 10).await, Err(ServiceError::NotFound("chart"))));
        assert!(matches!(load_chart_by_handle(repo, 1, "sales").await, Err(ServiceError::NotFound("chart"))));
        assert!(matches!(load_namespace(repo, 3).await, Err(ServiceError::NotFound("namespace"))));
    }

    #[tokio::test]
    async fn bad_handle_rejected_before_lookup() {
        let store = seeded();
        let repo = store.repository();
        assert!(matches!(load_chart_by_handle(repo, 1, "9lives").await, Err(ServiceError::InvalidHandle)));
        assert!(matches!(load_chart_by_handle(repo, 1, "").await, Err(ServiceError::InvalidHandle)));
    }

    #[tokio::test]
    async fn unique_check_ignores_self() {
        let store = seeded();
        let repo = store.repository();
        repo.create_chart(&Chart { id: 10, namespace_id: 1, handle: "sales".into(), ..Chart::default() })
            .await
            .unwrap();

        assert!(unique_check(repo, 1, 10, "sales").await.is_ok());
        assert!(matches!(unique_check(repo, 1, 11, "SALES").await, Err(ServiceError::HandleNotUnique)));
        assert!(unique_check(repo, 2, 11, "sales").await.is_ok());
        assert!(unique_check(repo, 1, 11, "").await.is_ok());
    }
}
