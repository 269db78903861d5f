//! Label binder: keeps the label index in step with labeled resources.

use std::collections::BTreeMap;

use crate::store::{LabelRepository, StoreError};

pub type Labels = BTreeMap<String, String>;

/// A resource that carries labels.
pub trait LabeledResource {
    fn label_resource_kind(&self) -> &'static str;
    fn label_resource_id(&self) -> u64;
    fn labels(&self) -> Option<&Labels>;
    /// Empty sets are stored as `None`.
    fn set_labels(&mut self, labels: Labels);
}

/// Structural comparison; a missing set equals an empty one.
pub fn changed(old: Option<&Labels>, new: Option<&Labels>) -> bool {
    let empty = Labels::new();
    old.unwrap_or(&empty) != new.unwrap_or(&empty)
}

/// IDs of resources of `kind` carrying every label in `labels`, optionally
/// restricted to `ids`.
pub async fn search<R>(repo: &R, kind: &str, labels: &Labels, ids: &[u64]) -> Result<Vec<u64>, StoreError>
where
    R: LabelRepository + ?Sized,
{
    repo.search_labeled_resources(kind, labels, ids).await
}

/// Hydrates labels for the whole set with one store round trip.
pub async fn load<R, T>(repo: &R, set: &mut [T]) -> Result<(), StoreError>
where
    R: LabelRepository + ?Sized,
    T: LabeledResource,
{
    let Some(first) = set.first() else { return Ok(()) };
    let kind = first.label_resource_kind();
    let ids: Vec<u64> = set.iter().map(|r| r.label_resource_id()).collect();
    let mut loaded = repo.load_labels(kind, &ids).await?;
    for res in set.iter_mut() {
        let labels = loaded.remove(&res.label_resource_id()).unwrap_or_default();
        res.set_labels(labels);
    }
    Ok(())
}

pub async fn create<R, T>(repo: &R, res: &T) -> Result<(), StoreError>
where
    R: LabelRepository + ?Sized,
    T: LabeledResource,
{
    match res.labels() {
        Some(labels) if !labels.is_empty() => {
            repo.replace_labels(res.label_resource_kind(), res.label_resource_id(), labels).await
        }
        _ => Ok(()),
    }
}

/// Replaces the stored set with the resource's current labels.
pub async fn update<R, T>(repo: &R, res: &T) -> Result<(), StoreError>
where
    R: LabelRepository + ?Sized,
    T: LabeledResource,
{
    let empty = Labels::new();
    repo.replace_labels(res.label_resource_kind(), res.label_resource_id(), res.labels().unwrap_or(&empty))
        .await
}
