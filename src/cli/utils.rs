use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "status": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a single story, or its JSON
pub fn output_story(output_format: &OutputFormat, story: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(story)?),
        OutputFormat::Text => {
            println!("#{} {}", story["id"], text(&story["title"]));
            if let Some(owner) = story.get("user").filter(|u| !u.is_null()) {
                println!("Owner: {} <{}>", text(&owner["name"]), text(&owner["email"]));
            }
            if let Some(url) = story["image_url"].as_str() {
                println!("Image: {}", url);
            }
            println!("Created: {}", text(&story["created_at"]));
            println!();
            println!("{}", text(&story["content"]));
        }
    }
    Ok(())
}

/// Print one page of a story listing, or its JSON
pub fn output_page(output_format: &OutputFormat, page: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page)?),
        OutputFormat::Text => {
            let stories = page["data"].as_array().map(Vec::as_slice).unwrap_or_default();
            if stories.is_empty() {
                println!("No stories found");
                return Ok(());
            }
            for story in stories {
                println!("{:>6}  {}", story["id"], text(&story["title"]));
            }
            println!(
                "Page {} of {} ({} total)",
                page["current_page"], page["last_page"], page["total"]
            );
        }
    }
    Ok(())
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
