//! Chart service: find, create, update, delete and undelete charts inside a
//! namespace.
//!
//! Every verb records exactly one action, success or not. Writes run in a
//! single store transaction that is committed only when the whole verb
//! succeeded.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::access::ChartAccessController;
use super::actions::{ChartAction, ChartActionProps};
use super::changes::ChartChanges;
use super::domain::{Chart, ChartFilter, CHART_RESOURCE_TYPE};
use super::loader::{load_chart, load_chart_by_handle, load_chart_combo, load_namespace, unique_check};
use crate::actionlog::{ActionRecorder, TracingRecorder};
use crate::context::Context;
use crate::errors::ServiceError;
use crate::handle;
use crate::ids::{IdProvider, Snowflake};
use crate::label::{self, LabeledResource};
use crate::locale::{Locale, Translatable};
use crate::stale::is_stale;
use crate::store::{self, ChartRepository, ComposeRepository, ComposeStore};

#[derive(Clone, Copy)]
enum ChartRef<'a> {
    Id(u64),
    Handle(&'a str),
}

/// What the updater applies to a loaded chart.
enum ChartMutation {
    Update(Chart),
    Delete,
    Undelete,
}

/// ```
/// use std::sync::Arc;
/// use service::compose::{AllowAll, Chart, ChartService, Namespace};
/// use service::store::memory::MemoryStore;
/// use service::Context;
///
/// let store = MemoryStore::new();
/// store.add_namespace(Namespace { id: 1, slug: "crm".into(), ..Namespace::default() });
/// let svc = ChartService::new(Arc::new(store), Arc::new(AllowAll));
/// let ctx = Context::new(1);
///
/// let new = Chart { namespace_id: 1, handle: "sales".into(), ..Chart::default() };
/// let c = tokio_test::block_on(svc.create(&ctx, new)).unwrap();
/// let found = tokio_test::block_on(svc.find_by_handle(&ctx, 1, "SALES")).unwrap();
/// assert_eq!(found.id, c.id);
/// ```
pub struct ChartService<S: ComposeStore> {
    store: Arc<S>,
    ac: Arc<dyn ChartAccessController>,
    actionlog: Arc<dyn ActionRecorder>,
    locale: Locale,
    ids: Arc<dyn IdProvider>,
}

impl<S: ComposeStore> ChartService<S> {
    pub fn new(store: Arc<S>, ac: Arc<dyn ChartAccessController>) -> Self {
        Self {
            store,
            ac,
            actionlog: Arc::new(TracingRecorder),
            locale: Locale::default(),
            ids: Arc::new(Snowflake::new()),
        }
    }

    pub fn with_actionlog(mut self, actionlog: Arc<dyn ActionRecorder>) -> Self {
        self.actionlog = actionlog;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdProvider>) -> Self {
        self.ids = ids;
        self
    }

    pub fn store(&self) -> &Arc<S> { &self.store }

    /// Charts in the filter's namespace the actor may read, with labels and
    /// translations applied. Returns the filter as it was resolved.
    #[instrument(skip(self, ctx, filter), fields(namespace_id = filter.namespace_id))]
    pub async fn find(&self, ctx: &Context, filter: ChartFilter) -> Result<(Vec<Chart>, ChartFilter), ServiceError> {
        let mut props = ChartActionProps::new().with_filter(&filter);
        let mut filter = filter;

        let res = async {
            ctx.check()?;
            let repo = self.store.repository();
            let ns = load_namespace(repo, filter.namespace_id).await?;
            props = props.with_namespace(&ns);

            if !self.ac.can_search_charts_on_namespace(ctx, &ns).await {
                return Err(ServiceError::NotAllowed("search charts"));
            }

            if !filter.labels.is_empty() {
                filter.labeled_ids =
                    label::search(repo, CHART_RESOURCE_TYPE, &filter.labels, &filter.chart_id).await?;
                if filter.labeled_ids.is_empty() {
                    debug!("no_labeled_charts");
                    return Ok((Vec::new(), filter.clone()));
                }
            }

            // the limit counts readable charts only, so keep paging past denied ones
            let limit = filter.limit as usize;
            let mut set = Vec::new();
            let mut page = filter.clone();
            loop {
                let found = repo.search_charts(&page).await?;
                let exhausted = limit == 0 || found.len() < limit;
                let last = found.last().map(|c| c.id);
                for c in found {
                    if limit > 0 && set.len() == limit {
                        break;
                    }
                    if self.ac.can_read_chart(ctx, &c).await {
                        set.push(c);
                    }
                }
                match last {
                    Some(id) if !exhausted && set.len() < limit => {
                        ctx.check()?;
                        page.after_id = id;
                    }
                    _ => break,
                }
            }

            label::load(repo, &mut set).await?;
            for c in set.iter_mut() {
                self.locale.decode(ctx, repo, c).await;
            }
            Ok::<_, ServiceError>((set, filter.clone()))
        }
        .await;

        self.record_action(ctx, props, ChartAction::Search, res).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn find_by_id(&self, ctx: &Context, namespace_id: u64, chart_id: u64) -> Result<Chart, ServiceError> {
        self.lookup(ctx, namespace_id, ChartRef::Id(chart_id)).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn find_by_handle(&self, ctx: &Context, namespace_id: u64, handle: &str) -> Result<Chart, ServiceError> {
        self.lookup(ctx, namespace_id, ChartRef::Handle(handle)).await
    }

    async fn lookup(&self, ctx: &Context, namespace_id: u64, by: ChartRef<'_>) -> Result<Chart, ServiceError> {
        let mut seed = Chart { namespace_id, ..Chart::default() };
        match by {
            ChartRef::Id(id) => seed.id = id,
            ChartRef::Handle(h) => seed.handle = h.to_string(),
        }
        let mut props = ChartActionProps::new().with_chart(&seed);

        let res = async {
            ctx.check()?;
            let repo = self.store.repository();
            let ns = load_namespace(repo, namespace_id).await?;
            props = props.with_namespace(&ns);

            let mut c = match by {
                ChartRef::Id(id) => load_chart(repo, namespace_id, id).await?,
                ChartRef::Handle(h) => load_chart_by_handle(repo, namespace_id, h).await?,
            };
            props = props.with_chart(&c);

            if !self.ac.can_read_chart(ctx, &c).await {
                return Err(ServiceError::NotAllowed("read this chart"));
            }

            self.locale.decode(ctx, repo, &mut c).await;
            label::load(repo, std::slice::from_mut(&mut c)).await?;
            Ok::<_, ServiceError>(c)
        }
        .await;

        self.record_action(ctx, props, ChartAction::Lookup, res).await
    }

    /// Stores a new chart. The store assigns nothing; ID, timestamps and
    /// nested IDs come from the service.
    #[instrument(skip(self, ctx, new), fields(namespace_id = new.namespace_id, handle = %new.handle))]
    pub async fn create(&self, ctx: &Context, new: Chart) -> Result<Chart, ServiceError> {
        let mut props = ChartActionProps::new().with_chart(&new);

        let res = async {
            ctx.check()?;
            if !handle::is_valid(&new.handle) {
                return Err(ServiceError::InvalidHandle);
            }

            let tx = self.store.begin().await?;
            let res = async {
                let mut c = new;
                let ns = load_namespace(&tx, c.namespace_id).await?;
                props = props.with_namespace(&ns);

                if !self.ac.can_create_chart_on_namespace(ctx, &ns).await {
                    return Err(ServiceError::NotAllowed("create charts"));
                }

                unique_check(&tx, ns.id, 0, &c.handle).await?;

                c.id = self.ids.next_id();
                c.created_at = self.ids.now();
                c.updated_at = None;
                c.deleted_at = None;
                c.config.generate_ids(&*self.ids);
                props = props.with_changed(&c);

                ctx.check()?;
                tx.create_chart(&c).await?;
                self.locale
                    .update_translations(ctx, &*self.ac, &tx, c.encode_translations())
                    .await?;
                label::create(&tx, &c).await?;
                Ok::<_, ServiceError>(c)
            }
            .await;
            store::finish(tx, res).await
        }
        .await;

        self.record_action(ctx, props, ChartAction::Create, res).await
    }

    /// Applies name, handle, config and labels from `upd` to the stored
    /// chart identified by `upd.namespace_id` and `upd.id`.
    #[instrument(skip(self, ctx, upd), fields(namespace_id = upd.namespace_id, chart_id = upd.id))]
    pub async fn update(&self, ctx: &Context, upd: Chart) -> Result<Chart, ServiceError> {
        let (namespace_id, chart_id) = (upd.namespace_id, upd.id);
        self.updater(ctx, namespace_id, chart_id, ChartAction::Update, ChartMutation::Update(upd))
            .await
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_by_id(&self, ctx: &Context, namespace_id: u64, chart_id: u64) -> Result<(), ServiceError> {
        self.updater(ctx, namespace_id, chart_id, ChartAction::Delete, ChartMutation::Delete)
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, ctx))]
    pub async fn undelete_by_id(&self, ctx: &Context, namespace_id: u64, chart_id: u64) -> Result<(), ServiceError> {
        self.updater(ctx, namespace_id, chart_id, ChartAction::Undelete, ChartMutation::Undelete)
            .await
            .map(|_| ())
    }

    async fn updater(
        &self,
        ctx: &Context,
        namespace_id: u64,
        chart_id: u64,
        action: ChartAction,
        mutation: ChartMutation,
    ) -> Result<Chart, ServiceError> {
        let mut props = ChartActionProps::new().with_chart(&Chart { id: chart_id, namespace_id, ..Chart::default() });

        let res = async {
            ctx.check()?;
            let tx = self.store.begin().await?;
            let res = async {
                let (ns, mut c) = load_chart_combo(&tx, namespace_id, chart_id).await?;
                label::load(&tx, std::slice::from_mut(&mut c)).await?;
                props = props.with_namespace(&ns).with_chart(&c);

                let mut changes = match &mutation {
                    ChartMutation::Update(upd) => self.handle_update(ctx, &tx, &mut c, upd).await?,
                    ChartMutation::Delete => self.handle_delete(ctx, &mut c).await?,
                    ChartMutation::Undelete => self.handle_undelete(ctx, &tx, &mut c).await?,
                };

                if c.config.generate_ids(&*self.ids) {
                    changes.core = true;
                }
                props = props.with_changed(&c);

                ctx.check()?;
                if changes.core {
                    tx.update_chart(&c).await?;
                } else {
                    debug!(chart_id = c.id, "chart_unchanged");
                }

                self.locale
                    .update_translations(ctx, &*self.ac, &tx, c.encode_translations())
                    .await?;

                if changes.labels {
                    label::update(&tx, &c).await?;
                }
                Ok::<_, ServiceError>(c)
            }
            .await;
            store::finish(tx, res).await
        }
        .await;

        self.record_action(ctx, props, action, res).await
    }

    async fn handle_update<R>(&self, ctx: &Context, repo: &R, res: &mut Chart, upd: &Chart) -> Result<ChartChanges, ServiceError>
    where
        R: ComposeRepository + ?Sized,
    {
        if is_stale(upd.updated_at, res.updated_at, res.created_at) {
            return Err(ServiceError::StaleData);
        }
        if upd.handle != res.handle && !handle::is_valid(&upd.handle) {
            return Err(ServiceError::InvalidHandle);
        }
        unique_check(repo, res.namespace_id, res.id, &upd.handle).await?;

        if !self.ac.can_update_chart(ctx, res).await {
            return Err(ServiceError::NotAllowed("update this chart"));
        }

        let mut changes = ChartChanges::UNCHANGED;
        if res.name != upd.name {
            res.name = upd.name.clone();
            changes.core = true;
        }
        if res.handle != upd.handle {
            res.handle = upd.handle.clone();
            changes.core = true;
        }
        if res.config != upd.config {
            res.config = upd.config.clone();
            changes.core = true;
        }
        if res.config.generate_ids(&*self.ids) {
            changes.core = true;
        }
        if changes.core {
            res.updated_at = Some(self.ids.now());
        }

        if let Some(labels) = &upd.labels {
            if label::changed(res.labels.as_ref(), Some(labels)) {
                res.set_labels(labels.clone());
                changes.labels = true;
            }
        }
        Ok(changes)
    }

    async fn handle_delete(&self, ctx: &Context, res: &mut Chart) -> Result<ChartChanges, ServiceError> {
        if !self.ac.can_delete_chart(ctx, res).await {
            return Err(ServiceError::NotAllowed("delete this chart"));
        }
        if res.is_deleted() {
            return Ok(ChartChanges::UNCHANGED);
        }
        res.deleted_at = Some(self.ids.now());
        Ok(ChartChanges::CORE)
    }

    async fn handle_undelete<R>(&self, ctx: &Context, repo: &R, res: &mut Chart) -> Result<ChartChanges, ServiceError>
    where
        R: ComposeRepository + ?Sized,
    {
        if !self.ac.can_undelete_chart(ctx, res).await {
            return Err(ServiceError::NotAllowed("undelete this chart"));
        }
        if !res.is_deleted() {
            return Ok(ChartChanges::UNCHANGED);
        }
        // a live chart may have taken the handle while this one was deleted
        unique_check(repo, res.namespace_id, res.id, &res.handle).await?;
        res.deleted_at = None;
        Ok(ChartChanges::CORE)
    }

    async fn record_action<T>(
        &self,
        ctx: &Context,
        props: ChartActionProps,
        action: ChartAction,
        res: Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let a = props.into_action(action, ctx, res.as_ref().err(), self.ids.now());
        self.actionlog.record(a).await;
        res
    }
}
