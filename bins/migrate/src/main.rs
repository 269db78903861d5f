use dotenvy::dotenv;
use migration::MigratorTrait;
use tracing::info;

use common::utils::logging::init_logging_default;
use configs::AppConfig;
use models::db::connect_with_config;

/// `migrate [up|down [N]|status|fresh]`, defaults to `up`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_default();

    let cfg = AppConfig::load_and_validate()?;
    let db = connect_with_config(&cfg.database).await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str).unwrap_or("up") {
        "up" => {
            migration::Migrator::up(&db, None).await?;
            info!("migrations_applied");
        }
        "down" => {
            let steps = match args.get(1) {
                Some(n) => n.parse::<u32>()?,
                None => 1,
            };
            migration::Migrator::down(&db, Some(steps)).await?;
            info!(steps, "migrations_reverted");
        }
        "status" => migration::Migrator::status(&db).await?,
        "fresh" => {
            migration::Migrator::fresh(&db).await?;
            info!("schema_recreated");
        }
        other => anyhow::bail!("unknown command {other:?}, expected up, down, status or fresh"),
    }
    Ok(())
}
