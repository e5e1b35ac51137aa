use crate::config::AppConfig;
use crate::database::Database;

pub async fn handle(config: &AppConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config.database).await?;
    database.migrate().await?;
    database.close().await;
    println!("✓ Migrations applied");
    Ok(())
}
