use serde_json::json;

use crate::auth::generate_jwt;
use crate::cli::OutputFormat;
use crate::config::config;

pub fn handle(user_id: i64, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let token = generate_jwt(user_id, security)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "status": true,
                "data": {
                    "token": token,
                    "user_id": user_id,
                    "expires_in_hours": security.jwt_expiry_hours,
                }
            }))?
        ),
        // Bare token so it can be captured into STORY_API_TOKEN
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
