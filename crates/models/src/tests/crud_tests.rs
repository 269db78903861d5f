use super::fresh_id;
use crate::db::connect;
use crate::{chart, label, namespace, resource_translation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use anyhow::Result;
use chrono::Utc;
use migration::MigratorTrait;

/// Migrated connection; `None` when no database is reachable
async fn setup_test_db() -> Option<DatabaseConnection> {
    let db = connect().await.ok()?;
    migration::Migrator::up(&db, None).await.ok()?;
    Some(db)
}

#[tokio::test]
async fn test_namespace_create_validates() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }

    let Some(db) = setup_test_db().await else { return Ok(()) };
    assert!(namespace::create(&db, 0, "zero", "zero").await.is_err());
    assert!(namespace::create(&db, fresh_id(), "  ", "blank").await.is_err());

    let id = fresh_id();
    let ns = namespace::create(&db, id, "CRM", "crm").await?;
    assert_eq!(ns.id, id);
    assert!(ns.enabled);
    assert!(ns.deleted_at.is_none());

    namespace::Entity::delete_by_id(id).exec(&db).await?;
    Ok(())
}

/// Chart row with JSON config survives a write/read cycle
#[tokio::test]
async fn test_chart_crud() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }

    let Some(db) = setup_test_db().await else { return Ok(()) };
    let ns = namespace::create(&db, fresh_id(), "Charts", "charts").await?;

    let id = fresh_id();
    let cfg = serde_json::json!({"reports": [{"reportID": "7", "metrics": [{"metricID": "8", "field": "count"}]}]});
    let am = chart::ActiveModel {
        id: Set(id),
        rel_namespace: Set(ns.id),
        handle: Set("sales".into()),
        name: Set("Sales".into()),
        config: Set(cfg.clone()),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
        deleted_at: Set(None),
    };
    am.insert(&db).await?;

    let found = chart::Entity::find_by_id(id).one(&db).await?.expect("chart stored");
    assert_eq!(found.config, cfg);
    assert_eq!(found.rel_namespace, ns.id);

    let mut upd: chart::ActiveModel = found.into();
    upd.deleted_at = Set(Some(Utc::now().into()));
    let upd = upd.update(&db).await?;
    assert!(upd.deleted_at.is_some());

    chart::Entity::delete_by_id(id).exec(&db).await?;
    namespace::Entity::delete_by_id(ns.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn test_labels_and_translations() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }

    let Some(db) = setup_test_db().await else { return Ok(()) };
    let rid = fresh_id();

    label::ActiveModel {
        kind: Set("compose:chart".into()),
        rel_resource: Set(rid),
        name: Set("team".into()),
        value: Set("sales".into()),
    }
    .insert(&db)
    .await?;

    let rows = label::Entity::find()
        .filter(label::Column::Kind.eq("compose:chart"))
        .filter(label::Column::RelResource.eq(rid))
        .all(&db)
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, "sales");

    let resource = format!("compose:chart/1/{}", rid);
    let tr = resource_translation::ActiveModel {
        lang: Set("de".into()),
        resource: Set(resource.clone()),
        k: Set("name".into()),
        message: Set("Umsatz".into()),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(&db)
    .await?;
    assert!(tr.id > 0);

    label::Entity::delete_many().filter(label::Column::RelResource.eq(rid)).exec(&db).await?;
    resource_translation::Entity::delete_many()
        .filter(resource_translation::Column::Resource.eq(resource))
        .exec(&db)
        .await?;
    Ok(())
}
