//! In-memory compose store.
//!
//! Transactions take a store-wide writer lock, work on a private copy of the
//! state and publish it on commit, so they are serialisable. Reads outside a
//! transaction see the last committed state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use super::{
    ChartRepository, ComposeStore, LabelRepository, NamespaceRepository, StoreError, Transaction,
    TranslationRepository,
};
use crate::compose::domain::{Chart, ChartFilter, Namespace};
use crate::label::Labels;
use crate::locale::ResourceTranslation;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, Default)]
struct State {
    namespaces: BTreeMap<u64, Namespace>,
    charts: BTreeMap<u64, Chart>,
    labels: BTreeMap<(String, u64), Labels>,
    // (lang, resource, key) -> message
    translations: BTreeMap<(String, String, String), String>,
}

impl State {
    fn handle_taken(&self, chart: &Chart) -> bool {
        if chart.handle.is_empty() || chart.deleted_at.is_some() {
            return false;
        }
        let handle = chart.handle.to_lowercase();
        self.charts.values().any(|c| {
            c.id != chart.id
                && c.namespace_id == chart.namespace_id
                && c.deleted_at.is_none()
                && c.handle.to_lowercase() == handle
        })
    }

    fn search_charts(&self, f: &ChartFilter) -> Vec<Chart> {
        let query = f.query.to_lowercase();
        let handle = f.handle.to_lowercase();
        let matches = self.charts.values().filter(|c| {
            c.namespace_id == f.namespace_id
                && f.deleted.admits(c.deleted_at)
                && c.id > f.after_id
                && (f.chart_id.is_empty() || f.chart_id.contains(&c.id))
                && (f.labeled_ids.is_empty() || f.labeled_ids.contains(&c.id))
                && (handle.is_empty() || c.handle.to_lowercase() == handle)
                && (f.name.is_empty() || c.name == f.name)
                && (query.is_empty()
                    || c.name.to_lowercase().contains(&query)
                    || c.handle.to_lowercase().contains(&query))
        });
        let limit = if f.limit == 0 { usize::MAX } else { f.limit as usize };
        matches.take(limit).cloned().collect()
    }
}

/// Repository handle. Outside a transaction it reads and writes committed
/// state directly; inside one it works on the transaction's copy.
pub struct MemoryRepo {
    state: Arc<Mutex<State>>,
    faults: Arc<Mutex<HashSet<&'static str>>>,
    tx: Option<(Arc<Mutex<State>>, OwnedMutexGuard<()>)>,
}

impl MemoryRepo {
    fn state(&self) -> MutexGuard<'_, State> { lock(&self.state) }

    fn fault(&self, op: &'static str) -> Result<(), StoreError> {
        if lock(&self.faults).contains(op) {
            return Err(StoreError::Db(format!("injected failure in {}", op)));
        }
        Ok(())
    }
}

pub struct MemoryStore {
    repo: MemoryRepo,
    writer: Arc<tokio::sync::Mutex<()>>,
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            repo: MemoryRepo {
                state: Arc::new(Mutex::new(State::default())),
                faults: Arc::new(Mutex::new(HashSet::new())),
                tx: None,
            },
            writer: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Namespaces are managed outside this layer; tests seed them here.
    pub fn add_namespace(&self, ns: Namespace) {
        self.repo.state().namespaces.insert(ns.id, ns);
    }

    /// Makes every later call of the named write operation fail, e.g.
    /// `"update_chart"` or `"upsert_resource_translations"`.
    pub fn fail_on(&self, op: &'static str) {
        lock(&self.repo.faults).insert(op);
    }

    pub fn clear_faults(&self) {
        lock(&self.repo.faults).clear();
    }

    /// Committed chart row, without labels.
    pub fn stored_chart(&self, id: u64) -> Option<Chart> {
        self.repo.state().charts.get(&id).cloned()
    }

    pub fn stored_labels(&self, kind: &str, id: u64) -> Labels {
        self.repo.state().labels.get(&(kind.to_string(), id)).cloned().unwrap_or_default()
    }

    pub fn stored_translations(&self) -> Vec<ResourceTranslation> {
        self.repo
            .state()
            .translations
            .iter()
            .map(|((lang, resource, key), msg)| ResourceTranslation {
                lang: lang.clone(),
                resource: resource.clone(),
                key: key.clone(),
                msg: msg.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ComposeStore for MemoryStore {
    type Repo = MemoryRepo;
    type Tx = MemoryRepo;

    fn repository(&self) -> &MemoryRepo { &self.repo }

    async fn begin(&self) -> Result<MemoryRepo, StoreError> {
        let guard = self.writer.clone().lock_owned().await;
        let working = self.repo.state().clone();
        Ok(MemoryRepo {
            state: Arc::new(Mutex::new(working)),
            faults: self.repo.faults.clone(),
            tx: Some((self.repo.state.clone(), guard)),
        })
    }
}

#[async_trait]
impl Transaction for MemoryRepo {
    async fn commit(self) -> Result<(), StoreError> {
        let MemoryRepo { state, tx, .. } = self;
        if let Some((committed, _guard)) = tx {
            let working = lock(&state).clone();
            *lock(&committed) = working;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // the working copy and the writer lock are released on drop
        Ok(())
    }
}

#[async_trait]
impl NamespaceRepository for MemoryRepo {
    async fn lookup_namespace_by_id(&self, id: u64) -> Result<Option<Namespace>, StoreError> {
        Ok(self.state().namespaces.get(&id).cloned())
    }
}

#[async_trait]
impl ChartRepository for MemoryRepo {
    async fn search_charts(&self, filter: &ChartFilter) -> Result<Vec<Chart>, StoreError> {
        Ok(self.state().search_charts(filter))
    }

    async fn lookup_chart_by_id(&self, id: u64) -> Result<Option<Chart>, StoreError> {
        Ok(self.state().charts.get(&id).cloned())
    }

    async fn lookup_chart_by_namespace_id_handle(&self, namespace_id: u64, handle: &str) -> Result<Option<Chart>, StoreError> {
        if handle.is_empty() {
            return Ok(None);
        }
        let handle = handle.to_lowercase();
        Ok(self
            .state()
            .charts
            .values()
            .find(|c| c.namespace_id == namespace_id && c.deleted_at.is_none() && c.handle.to_lowercase() == handle)
            .cloned())
    }

    async fn create_chart(&self, chart: &Chart) -> Result<(), StoreError> {
        self.fault("create_chart")?;
        let mut state = self.state();
        if state.charts.contains_key(&chart.id) {
            return Err(StoreError::Db(format!("duplicate chart ID {}", chart.id)));
        }
        if state.handle_taken(chart) {
            return Err(StoreError::HandleTaken);
        }
        state.charts.insert(chart.id, Chart { labels: None, ..chart.clone() });
        Ok(())
    }

    async fn update_chart(&self, chart: &Chart) -> Result<(), StoreError> {
        self.fault("update_chart")?;
        let mut state = self.state();
        if !state.charts.contains_key(&chart.id) {
            return Err(StoreError::Db(format!("chart {} does not exist", chart.id)));
        }
        if state.handle_taken(chart) {
            return Err(StoreError::HandleTaken);
        }
        state.charts.insert(chart.id, Chart { labels: None, ..chart.clone() });
        Ok(())
    }
}

#[async_trait]
impl LabelRepository for MemoryRepo {
    async fn search_labeled_resources(&self, kind: &str, labels: &Labels, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let state = self.state();
        Ok(state
            .labels
            .iter()
            .filter(|((k, id), _)| k == kind && (ids.is_empty() || ids.contains(id)))
            .filter(|(_, stored)| labels.iter().all(|(name, value)| stored.get(name) == Some(value)))
            .map(|((_, id), _)| *id)
            .collect())
    }

    async fn load_labels(&self, kind: &str, ids: &[u64]) -> Result<HashMap<u64, Labels>, StoreError> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.labels.get(&(kind.to_string(), *id)).map(|l| (*id, l.clone())))
            .collect())
    }

    async fn replace_labels(&self, kind: &str, id: u64, labels: &Labels) -> Result<(), StoreError> {
        self.fault("replace_labels")?;
        let mut state = self.state();
        let key = (kind.to_string(), id);
        if labels.is_empty() {
            state.labels.remove(&key);
        } else {
            state.labels.insert(key, labels.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl TranslationRepository for MemoryRepo {
    async fn resource_translations(&self, lang: &str, resource: &str) -> Result<Vec<ResourceTranslation>, StoreError> {
        let state = self.state();
        Ok(state
            .translations
            .iter()
            .filter(|((l, r, _), _)| l == lang && r == resource)
            .map(|((l, r, k), msg)| ResourceTranslation {
                lang: l.clone(),
                resource: r.clone(),
                key: k.clone(),
                msg: msg.clone(),
            })
            .collect())
    }

    async fn upsert_resource_translations(&self, tt: &[ResourceTranslation]) -> Result<(), StoreError> {
        self.fault("upsert_resource_translations")?;
        let mut state = self.state();
        for t in tt {
            state
                .translations
                .insert((t.lang.clone(), t.resource.clone(), t.key.clone()), t.msg.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(id: u64, ns: u64, handle: &str) -> Chart {
        Chart { id, namespace_id: ns, handle: handle.into(), name: handle.to_uppercase(), ..Chart::default() }
    }

    #[tokio::test]
    async fn commit_publishes_and_rollback_discards() {
        let store = MemoryStore::new();

        let tx = store.begin().await.unwrap();
        tx.create_chart(&chart(1, 1, "kept")).await.unwrap();
        assert!(store.stored_chart(1).is_none());
        tx.commit().await.unwrap();
        assert!(store.stored_chart(1).is_some());

        let tx = store.begin().await.unwrap();
        tx.create_chart(&chart(2, 1, "dropped")).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(store.stored_chart(2).is_none());
    }

    #[tokio::test]
    async fn handle_lookup_is_scoped_and_skips_deleted() {
        let store = MemoryStore::new();
        let repo = store.repository();
        repo.create_chart(&chart(1, 1, "sales")).await.unwrap();
        let mut deleted = chart(2, 2, "sales");
        deleted.deleted_at = Some(chrono::Utc::now());
        repo.create_chart(&deleted).await.unwrap();

        assert_eq!(repo.lookup_chart_by_namespace_id_handle(1, "SALES").await.unwrap().map(|c| c.id), Some(1));
        assert!(repo.lookup_chart_by_namespace_id_handle(2, "sales").await.unwrap().is_none());
        assert!(repo.lookup_chart_by_namespace_id_handle(1, "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn live_handles_are_unique_per_namespace() {
        let store = MemoryStore::new();
        let repo = store.repository();
        repo.create_chart(&chart(1, 1, "sales")).await.unwrap();
        assert!(matches!(repo.create_chart(&chart(2, 1, "Sales")).await, Err(StoreError::HandleTaken)));
        repo.create_chart(&chart(3, 2, "sales")).await.unwrap();
    }

    #[tokio::test]
    async fn search_resumes_after_cursor() {
        let store = MemoryStore::new();
        let repo = store.repository();
        for id in 1..=4 {
            repo.create_chart(&chart(id, 1, "")).await.unwrap();
        }
        let f = ChartFilter { after_id: 2, limit: 1, ..ChartFilter::for_namespace(1) };
        let page: Vec<u64> = repo.search_charts(&f).await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(page, vec![3]);
    }

    #[tokio::test]
    async fn label_search_requires_every_label() {
        let store = MemoryStore::new();
        let repo = store.repository();
        let both: Labels = [("team", "sales"), ("tier", "1")].iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let one: Labels = [("team", "sales")].iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        repo.replace_labels("compose:chart", 1, &both).await.unwrap();
        repo.replace_labels("compose:chart", 2, &one).await.unwrap();
        repo.replace_labels("compose:module", 3, &both).await.unwrap();

        assert_eq!(repo.search_labeled_resources("compose:chart", &both, &[]).await.unwrap(), vec![1]);
        assert_eq!(repo.search_labeled_resources("compose:chart", &one, &[]).await.unwrap(), vec![1, 2]);
        assert_eq!(repo.search_labeled_resources("compose:chart", &one, &[2]).await.unwrap(), vec![2]);

        let loaded = repo.load_labels("compose:chart", &[1, 2, 9]).await.unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn injected_faults_fail_writes() {
        let store = MemoryStore::new();
        store.fail_on("update_chart");
        let repo = store.repository();
        repo.create_chart(&chart(1, 1, "sales")).await.unwrap();
        assert!(repo.update_chart(&chart(1, 1, "sales")).await.is_err());
        store.clear_faults();
        repo.update_chart(&chart(1, 1, "sales")).await.unwrap();
    }
}
