use crate::cli::{utils, OutputFormat};
use crate::config::config;
use crate::database::{schema, DatabaseManager};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database).await?;
    schema::ensure_schema(&pool).await?;
    utils::output_success(&output_format, "Schema is up to date", None)
}
