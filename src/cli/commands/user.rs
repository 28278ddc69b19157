use clap::Subcommand;
use serde_json::json;

use crate::cli::{utils, OutputFormat};
use crate::config::config;
use crate::database::{DatabaseManager, PgStoryStore};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Insert a user row")]
    Add {
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Unique email address")]
        email: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Add { name, email } => {
            let pool = DatabaseManager::connect(&config().database).await?;
            let user = PgStoryStore::new(pool).insert_user(&name, &email).await?;

            utils::output_success(
                &output_format,
                &format!("Created user {} ({})", user.id, user.email),
                Some(json!(user)),
            )
        }
    }
}
