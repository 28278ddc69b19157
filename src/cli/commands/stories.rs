use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Subcommand;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::cli::{utils, OutputFormat};

const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Subcommand)]
pub enum StoriesCommands {
    #[command(about = "List stories, newest first")]
    List {
        #[arg(long, help = "Only stories owned by the token's user")]
        mine: bool,
        #[arg(long, default_value_t = 1, help = "Page number")]
        page: u32,
    },

    #[command(about = "Show a single story")]
    Show {
        #[arg(help = "Story id")]
        id: i64,
    },

    #[command(about = "Create a story")]
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, help = "Path to a png or jpeg image")]
        image: Option<PathBuf>,
    },

    #[command(about = "Replace the title and content of a story you own")]
    Update {
        #[arg(help = "Story id")]
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, help = "Path to a replacement png or jpeg image")]
        image: Option<PathBuf>,
    },

    #[command(about = "Delete a story you own")]
    Delete {
        #[arg(help = "Story id")]
        id: i64,
    },
}

/// Remote API endpoint and bearer token, from `STORY_API_URL` / `STORY_API_TOKEN`
struct Remote {
    client: Client,
    base_url: String,
    token: String,
}

impl Remote {
    fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("STORY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let token = std::env::var("STORY_API_TOKEN")
            .map_err(|_| anyhow!("STORY_API_TOKEN is not set (mint one with `story token --user-id N`)"))?;

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Sends the request and unwraps the `{ status, message, data }` envelope
    async fn send(&self, request: RequestBuilder) -> anyhow::Result<Value> {
        let response = request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.base_url))?;

        let status = response.status();
        let body: Value = response.json().await.context("server returned a non-JSON body")?;

        if !status.is_success() {
            return Err(anyhow!("{} ({})", error_summary(&body), status));
        }
        Ok(body)
    }
}

fn error_summary(body: &Value) -> String {
    let message = body["message"].as_str().unwrap_or("request failed").to_string();

    let Some(errors) = body["errors"].as_object() else {
        return message;
    };
    let details: Vec<String> = errors
        .iter()
        .flat_map(|(field, messages)| {
            messages
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(move |m| format!("  {}: {}", field, m))
        })
        .collect();

    format!("{}\n{}", message, details.join("\n"))
}

async fn story_form(title: String, content: String, image: Option<&Path>) -> anyhow::Result<Form> {
    let mut form = Form::new().text("title", title).text("content", content);

    if let Some(path) = image {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        form = form.part("image", Part::bytes(bytes).file_name(file_name));
    }

    Ok(form)
}

fn output_saved(output_format: &OutputFormat, body: &Value, fallback: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => utils::output_story(output_format, body),
        OutputFormat::Text => {
            let message = body["message"].as_str().unwrap_or(fallback);
            utils::output_success(output_format, &format!("{} (id {})", message, body["data"]["id"]), None)
        }
    }
}

pub async fn handle(cmd: StoriesCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let remote = Remote::from_env()?;

    match cmd {
        StoriesCommands::List { mine, page } => {
            let path = if mine { "/my-stories" } else { "/stories" };
            let request = remote.client.get(remote.url(path)).query(&[("page", page)]);
            let body = remote.send(request).await?;
            utils::output_page(&output_format, &body["data"])
        }
        StoriesCommands::Show { id } => {
            let request = remote.client.get(remote.url(&format!("/stories/{}", id)));
            let body = remote.send(request).await?;
            utils::output_story(&output_format, &body["data"])
        }
        StoriesCommands::Create { title, content, image } => {
            let form = story_form(title, content, image.as_deref()).await?;
            let request = remote.client.post(remote.url("/stories")).multipart(form);
            let body = remote.send(request).await?;
            output_saved(&output_format, &body, "Story created")
        }
        StoriesCommands::Update { id, title, content, image } => {
            let form = story_form(title, content, image.as_deref()).await?;
            // The API takes updates as POST so multipart works
            let request = remote
                .client
                .post(remote.url(&format!("/stories/{}", id)))
                .multipart(form);
            let body = remote.send(request).await?;
            output_saved(&output_format, &body, "Story updated")
        }
        StoriesCommands::Delete { id } => {
            let request = remote.client.delete(remote.url(&format!("/stories/{}", id)));
            let body = remote.send(request).await?;
            let message = body["message"].as_str().unwrap_or("Story deleted");
            utils::output_success(&output_format, message, None)
        }
    }
}
