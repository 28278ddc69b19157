//! In-process harness: the real router over an in-memory store and a temp-dir disk.
#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use story_api::auth::generate_jwt;
use story_api::config::AppConfig;
use story_api::database::models::{NewStory, Story, StoryChanges, StoryWithOwner, User};
use story_api::database::{DatabaseError, StoryScope, StoryStore};
use story_api::storage::LocalDisk;
use story_api::{router, AppState};

pub const BASE_URL: &str = "http://stories.test";

/// `StoryStore` over plain vectors with the same ordering rules as PostgreSQL
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    stories: Vec<Story>,
    next_story_id: i64,
}

impl MemoryStore {
    pub fn with_users(names: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut inner = store.inner.lock().unwrap();
            let now = Utc::now();
            for (i, name) in names.iter().enumerate() {
                inner.users.push(User {
                    id: i as i64 + 1,
                    name: name.to_string(),
                    email: format!("{}@example.com", name.to_lowercase()),
                    created_at: now,
                    updated_at: now,
                });
            }
        }
        store
    }

    /// Make every insert/update fail with a database error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn story(&self, id: i64) -> Option<Story> {
        self.inner.lock().unwrap().stories.iter().find(|s| s.id == id).cloned()
    }

    pub fn story_count(&self) -> usize {
        self.inner.lock().unwrap().stories.len()
    }

    /// Insert directly, `minutes_ago` in the past, bypassing the HTTP layer
    pub fn seed_story(&self, user_id: i64, title: &str, minutes_ago: i64) -> Story {
        let mut inner = self.inner.lock().unwrap();
        inner.next_story_id += 1;
        let at = Utc::now() - Duration::minutes(minutes_ago);
        let story = Story {
            id: inner.next_story_id,
            user_id,
            title: title.to_string(),
            content: format!("{} content", title),
            image: None,
            created_at: at,
            updated_at: at,
        };
        inner.stories.push(story.clone());
        story
    }

    fn check_writes(&self) -> Result<(), DatabaseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::Sqlx(sqlx::Error::Protocol("simulated write failure".into())));
        }
        Ok(())
    }
}

impl Inner {
    fn with_owner(&self, story: &Story) -> Option<StoryWithOwner> {
        let user = self.users.iter().find(|u| u.id == story.user_id)?.clone();
        Some(StoryWithOwner {
            story: story.clone(),
            user,
        })
    }

    fn scoped(&self, scope: StoryScope) -> Vec<&Story> {
        let mut stories: Vec<&Story> = self
            .stories
            .iter()
            .filter(|s| match scope {
                StoryScope::All => true,
                StoryScope::OwnedBy(id) => s.user_id == id,
            })
            .collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        stories
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.inner.lock().unwrap().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_with_owner(&self, id: i64) -> Result<Option<StoryWithOwner>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .stories
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| inner.with_owner(s)))
    }

    async fn latest(&self, scope: StoryScope, limit: i64, offset: i64) -> Result<Vec<StoryWithOwner>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .scoped(scope)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|s| inner.with_owner(s))
            .collect())
    }

    async fn count(&self, scope: StoryScope) -> Result<i64, DatabaseError> {
        Ok(self.inner.lock().unwrap().scoped(scope).len() as i64)
    }

    async fn insert(&self, new_story: NewStory) -> Result<Story, DatabaseError> {
        self.check_writes()?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_story_id += 1;
        let now = Utc::now();
        let story = Story {
            id: inner.next_story_id,
            user_id: new_story.user_id,
            title: new_story.title,
            content: new_story.content,
            image: new_story.image,
            created_at: now,
            updated_at: now,
        };
        inner.stories.push(story.clone());
        Ok(story)
    }

    async fn update(&self, id: i64, changes: StoryChanges) -> Result<Story, DatabaseError> {
        self.check_writes()?;
        let mut inner = self.inner.lock().unwrap();
        let story = inner
            .stories
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Story {} not found", id)))?;
        story.title = changes.title;
        story.content = changes.content;
        if let Some(image) = changes.image {
            story.image = Some(image);
        }
        story.updated_at = Utc::now();
        Ok(story.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.stories.len();
        inner.stories.retain(|s| s.id != id);
        if inner.stories.len() == before {
            return Err(DatabaseError::NotFound(format!("Story {} not found", id)));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: Arc<AppConfig>,
    disk_dir: TempDir,
}

impl TestApp {
    /// Users 1 (Alice) and 2 (Bob), no stories
    pub fn new() -> Result<Self> {
        let disk_dir = tempfile::tempdir()?;

        let mut config = AppConfig::development();
        config.storage.public_root = disk_dir.path().to_string_lossy().into_owned();
        config.storage.public_base_url = BASE_URL.to_string();
        config.api.enable_request_logging = false;
        let config = Arc::new(config);

        let store = Arc::new(MemoryStore::with_users(&["Alice", "Bob"]));
        let state = AppState::new(
            store.clone(),
            Arc::new(LocalDisk::new(disk_dir.path())),
            config.clone(),
        );

        Ok(Self {
            router: router(state),
            store,
            config,
            disk_dir,
        })
    }

    pub fn token(&self, user_id: i64) -> String {
        generate_jwt(user_id, &self.config.security).unwrap()
    }

    pub fn disk_path(&self, relative: &str) -> PathBuf {
        self.disk_dir.path().join(relative)
    }

    /// Files currently stored under `stories/`
    pub fn stored_images(&self) -> Vec<String> {
        let dir = self.disk_dir.path().join("stories");
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect()
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        Ok((status, body))
    }

    pub async fn get(&self, uri: &str, user_id: i64) -> Result<(StatusCode, Value)> {
        self.send(request(Method::GET, uri, Some(&self.token(user_id))).body(Body::empty())?)
            .await
    }

    pub async fn delete(&self, uri: &str, user_id: i64) -> Result<(StatusCode, Value)> {
        self.send(request(Method::DELETE, uri, Some(&self.token(user_id))).body(Body::empty())?)
            .await
    }

    pub async fn post_form(&self, uri: &str, user_id: i64, parts: Vec<Part>) -> Result<(StatusCode, Value)> {
        let (content_type, body) = multipart(parts);
        let request = request(Method::POST, uri, Some(&self.token(user_id)))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))?;
        self.send(request).await
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
}

pub enum Part {
    Text(&'static str, String),
    File {
        name: &'static str,
        file_name: &'static str,
        bytes: Vec<u8>,
    },
}

pub fn text(name: &'static str, value: &str) -> Part {
    Part::Text(name, value.to_string())
}

pub fn file(name: &'static str, file_name: &'static str, bytes: Vec<u8>) -> Part {
    Part::File { name, file_name, bytes }
}

const BOUNDARY: &str = "story-test-boundary";

pub fn multipart(parts: Vec<Part>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File { name, file_name, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn png() -> Vec<u8> {
    encoded(image::ImageOutputFormat::Png)
}

pub fn jpeg() -> Vec<u8> {
    encoded(image::ImageOutputFormat::Jpeg(80))
}

fn encoded(format: image::ImageOutputFormat) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(4, 4, image::Rgb([20u8, 120, 200])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}
