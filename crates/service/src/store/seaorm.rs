//! SeaORM-backed compose store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use super::{
    ChartRepository, ComposeStore, LabelRepository, NamespaceRepository, StoreError, Transaction,
    TranslationRepository,
};
use crate::compose::domain::{Chart, ChartConfig, ChartFilter, FilterState, Namespace};
use crate::label::Labels;
use crate::locale::ResourceTranslation;
use models::{chart, label, namespace, resource_translation};

const CHART_HANDLE_INDEX: &str = "uniq_compose_chart_handle";

/// Maps a violation of the live-handle index to [`StoreError::HandleTaken`].
fn chart_write_err(e: DbErr) -> StoreError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains(CHART_HANDLE_INDEX) => StoreError::HandleTaken,
        _ => e.into(),
    }
}

pub(crate) fn db_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::IdRange(id))
}

fn db_ids(ids: &[u64]) -> Result<Vec<i64>, StoreError> {
    ids.iter().map(|id| db_id(*id)).collect()
}

fn utc(ts: sea_orm::prelude::DateTimeWithTimeZone) -> DateTime<Utc> { ts.with_timezone(&Utc) }

fn namespace_from_model(m: namespace::Model) -> Namespace {
    Namespace {
        id: m.id as u64,
        name: m.name,
        slug: m.slug,
        enabled: m.enabled,
        created_at: utc(m.created_at),
        updated_at: m.updated_at.map(utc),
        deleted_at: m.deleted_at.map(utc),
    }
}

fn chart_from_model(m: chart::Model) -> Result<Chart, StoreError> {
    let config: ChartConfig = serde_json::from_value(m.config)?;
    Ok(Chart {
        id: m.id as u64,
        namespace_id: m.rel_namespace as u64,
        handle: m.handle,
        name: m.name,
        config,
        labels: None,
        created_at: utc(m.created_at),
        updated_at: m.updated_at.map(utc),
        deleted_at: m.deleted_at.map(utc),
    })
}

fn chart_to_active(c: &Chart) -> Result<chart::ActiveModel, StoreError> {
    Ok(chart::ActiveModel {
        id: Set(db_id(c.id)?),
        rel_namespace: Set(db_id(c.namespace_id)?),
        handle: Set(c.handle.clone()),
        name: Set(c.name.clone()),
        config: Set(serde_json::to_value(&c.config)?),
        created_at: Set(c.created_at.into()),
        updated_at: Set(c.updated_at.map(Into::into)),
        deleted_at: Set(c.deleted_at.map(Into::into)),
    })
}

/// Repository over any SeaORM connection: the pool for reads, a
/// `DatabaseTransaction` inside transactions.
pub struct SeaOrmRepository<C> {
    pub conn: C,
}

pub struct SeaOrmStore {
    repo: SeaOrmRepository<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self { Self { repo: SeaOrmRepository { conn: db } } }

    pub fn connection(&self) -> &DatabaseConnection { &self.repo.conn }
}

#[async_trait]
impl ComposeStore for SeaOrmStore {
    type Repo = SeaOrmRepository<DatabaseConnection>;
    type Tx = SeaOrmRepository<DatabaseTransaction>;

    fn repository(&self) -> &Self::Repo { &self.repo }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let txn = self.repo.conn.begin().await?;
        Ok(SeaOrmRepository { conn: txn })
    }
}

#[async_trait]
impl Transaction for SeaOrmRepository<DatabaseTransaction> {
    async fn commit(self) -> Result<(), StoreError> {
        self.conn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.conn.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl<C> NamespaceRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn lookup_namespace_by_id(&self, id: u64) -> Result<Option<Namespace>, StoreError> {
        let found = namespace::Entity::find_by_id(db_id(id)?).one(&self.conn).await?;
        Ok(found.map(namespace_from_model))
    }
}

#[async_trait]
impl<C> ChartRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn search_charts(&self, f: &ChartFilter) -> Result<Vec<Chart>, StoreError> {
        let mut finder = chart::Entity::find().filter(chart::Column::RelNamespace.eq(db_id(f.namespace_id)?));
        if !f.chart_id.is_empty() {
            finder = finder.filter(chart::Column::Id.is_in(db_ids(&f.chart_id)?));
        }
        if f.after_id > 0 {
            finder = finder.filter(chart::Column::Id.gt(db_id(f.after_id)?));
        }
        if !f.labeled_ids.is_empty() {
            finder = finder.filter(chart::Column::Id.is_in(db_ids(&f.labeled_ids)?));
        }
        if !f.handle.is_empty() {
            finder = finder.filter(Expr::expr(Func::lower(Expr::col(chart::Column::Handle))).eq(f.handle.to_lowercase()));
        }
        if !f.name.is_empty() {
            finder = finder.filter(chart::Column::Name.eq(f.name.clone()));
        }
        if !f.query.is_empty() {
            let pattern = format!("%{}%", f.query.to_lowercase());
            finder = finder.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(chart::Column::Name))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(chart::Column::Handle))).like(pattern)),
            );
        }
        finder = match f.deleted {
            FilterState::Excluded => finder.filter(chart::Column::DeletedAt.is_null()),
            FilterState::Inclusive => finder,
            FilterState::Exclusive => finder.filter(chart::Column::DeletedAt.is_not_null()),
        };
        finder = finder.order_by_asc(chart::Column::Id);
        if f.limit > 0 {
            finder = finder.limit(f.limit as u64);
        }
        let rows = finder.all(&self.conn).await?;
        rows.into_iter().map(chart_from_model).collect()
    }

    async fn lookup_chart_by_id(&self, id: u64) -> Result<Option<Chart>, StoreError> {
        let found = chart::Entity::find_by_id(db_id(id)?).one(&self.conn).await?;
        found.map(chart_from_model).transpose()
    }

    async fn lookup_chart_by_namespace_id_handle(&self, namespace_id: u64, handle: &str) -> Result<Option<Chart>, StoreError> {
        if handle.is_empty() {
            return Ok(None);
        }
        let found = chart::Entity::find()
            .filter(chart::Column::RelNamespace.eq(db_id(namespace_id)?))
            .filter(Expr::expr(Func::lower(Expr::col(chart::Column::Handle))).eq(handle.to_lowercase()))
            .filter(chart::Column::DeletedAt.is_null())
            .one(&self.conn)
            .await?;
        found.map(chart_from_model).transpose()
    }

    async fn create_chart(&self, c: &Chart) -> Result<(), StoreError> {
        chart_to_active(c)?.insert(&self.conn).await.map_err(chart_write_err)?;
        Ok(())
    }

    async fn update_chart(&self, c: &Chart) -> Result<(), StoreError> {
        chart_to_active(c)?.update(&self.conn).await.map_err(chart_write_err)?;
        Ok(())
    }
}

#[async_trait]
impl<C> LabelRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn search_labeled_resources(&self, kind: &str, labels: &Labels, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }
        let mut pairs = Condition::any();
        for (name, value) in labels {
            pairs = pairs.add(
                Condition::all()
                    .add(label::Column::Name.eq(name.clone()))
                    .add(label::Column::Value.eq(value.clone())),
            );
        }
        let mut finder = label::Entity::find().filter(label::Column::Kind.eq(kind)).filter(pairs);
        if !ids.is_empty() {
            finder = finder.filter(label::Column::RelResource.is_in(db_ids(ids)?));
        }
        let rows = finder.all(&self.conn).await?;

        // a resource matches when every requested label matched one of its rows
        let mut hits: HashMap<i64, usize> = HashMap::new();
        for row in rows {
            *hits.entry(row.rel_resource).or_default() += 1;
        }
        let mut out: Vec<u64> = hits
            .into_iter()
            .filter(|(_, n)| *n == labels.len())
            .map(|(id, _)| id as u64)
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    async fn load_labels(&self, kind: &str, ids: &[u64]) -> Result<HashMap<u64, Labels>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = label::Entity::find()
            .filter(label::Column::Kind.eq(kind))
            .filter(label::Column::RelResource.is_in(db_ids(ids)?))
            .all(&self.conn)
            .await?;
        let mut out: HashMap<u64, Labels> = HashMap::new();
        for row in rows {
            out.entry(row.rel_resource as u64).or_default().insert(row.name, row.value);
        }
        Ok(out)
    }

    async fn replace_labels(&self, kind: &str, id: u64, labels: &Labels) -> Result<(), StoreError> {
        let rid = db_id(id)?;
        label::Entity::delete_many()
            .filter(label::Column::Kind.eq(kind))
            .filter(label::Column::RelResource.eq(rid))
            .exec(&self.conn)
            .await?;
        if labels.is_empty() {
            return Ok(());
        }
        let rows = labels.iter().map(|(name, value)| label::ActiveModel {
            kind: Set(kind.to_string()),
            rel_resource: Set(rid),
            name: Set(name.clone()),
            value: Set(value.clone()),
        });
        label::Entity::insert_many(rows).exec_without_returning(&self.conn).await?;
        Ok(())
    }
}

#[async_trait]
impl<C> TranslationRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn resource_translations(&self, lang: &str, resource: &str) -> Result<Vec<ResourceTranslation>, StoreError> {
        let rows = resource_translation::Entity::find()
            .filter(resource_translation::Column::Lang.eq(lang))
            .filter(resource_translation::Column::Resource.eq(resource))
            .all(&self.conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| ResourceTranslation { lang: r.lang, resource: r.resource, key: r.k, msg: r.message })
            .collect())
    }

    async fn upsert_resource_translations(&self, tt: &[ResourceTranslation]) -> Result<(), StoreError> {
        let now = Utc::now();
        for t in tt {
            let am = resource_translation::ActiveModel {
                lang: Set(t.lang.clone()),
                resource: Set(t.resource.clone()),
                k: Set(t.key.clone()),
                message: Set(t.msg.clone()),
                created_at: Set(now.into()),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            };
            resource_translation::Entity::insert(am)
                .on_conflict(
                    OnConflict::columns([
                        resource_translation::Column::Lang,
                        resource_translation::Column::Resource,
                        resource_translation::Column::K,
                    ])
                    .update_columns([resource_translation::Column::Message, resource_translation::Column::UpdatedAt])
                    .to_owned(),
                )
                .exec_without_returning(&self.conn)
                .await?;
        }
        Ok(())
    }
}
