//! Request extractors for the story routes.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
};
use serde_json::Value;
use tracing::debug;

use crate::app::AppState;
use crate::database::models::StoryWithOwner;
use crate::error::ApiError;
use crate::validation::{FieldValue, FormInput, UploadedFile};

/// Story input from a multipart, JSON or urlencoded body.
pub struct StoryForm(pub FormInput);

#[async_trait]
impl<S> FromRequest<S> for StoryForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    /// Bodies over the size limit reject with 413. Any other unreadable body
    /// counts as no input, so the caller sees the usual 422 field messages.
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut input = FormInput::default();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = match Multipart::from_request(req, state).await {
                Ok(multipart) => multipart,
                Err(e) => {
                    unreadable(e.status(), e.body_text())?;
                    return Ok(StoryForm(input));
                }
            };

            loop {
                let field = match multipart.next_field().await {
                    Ok(Some(field)) => field,
                    Ok(None) => break,
                    Err(e) => {
                        unreadable(e.status(), e.body_text())?;
                        break;
                    }
                };

                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };

                let value = if field.file_name().is_some() {
                    let file_name = field.file_name().map(str::to_string);
                    match field.bytes().await {
                        Ok(bytes) => FieldValue::File(UploadedFile { file_name, bytes }),
                        Err(e) => {
                            unreadable(e.status(), e.body_text())?;
                            break;
                        }
                    }
                } else {
                    match field.text().await {
                        Ok(text) => FieldValue::Text(text),
                        Err(e) => {
                            unreadable(e.status(), e.body_text())?;
                            break;
                        }
                    }
                };

                input.insert(name, value);
            }
        } else {
            let bytes = match Bytes::from_request(req, state).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    unreadable(e.status(), e.body_text())?;
                    return Ok(StoryForm(input));
                }
            };

            if content_type.starts_with("application/json") {
                match serde_json::from_slice::<Value>(&bytes) {
                    Ok(Value::Object(body)) => {
                        for (name, value) in body {
                            let value = match value {
                                Value::String(s) => FieldValue::Text(s),
                                other => FieldValue::Other(other),
                            };
                            input.insert(name, value);
                        }
                    }
                    Ok(_) => debug!("Ignoring JSON body that is not an object"),
                    Err(e) => debug!("Ignoring unparseable JSON body: {}", e),
                }
            } else {
                // urlencoded, or no body at all
                for (name, value) in url::form_urlencoded::parse(&bytes) {
                    input.insert(name.into_owned(), FieldValue::Text(value.into_owned()));
                }
            }
        }

        Ok(StoryForm(input))
    }
}

/// 413 passes through; anything else is logged and dropped.
fn unreadable(status: StatusCode, detail: String) -> Result<(), ApiError> {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return Err(ApiError::payload_too_large("The request body is too large"));
    }
    debug!("Ignoring unreadable request body: {}", detail);
    Ok(())
}

/// The story named by the `:id` path segment, loaded with its owner.
///
/// Unknown or non-numeric ids reject with 404 before the handler runs.
pub struct BoundStory(pub StoryWithOwner);

#[async_trait]
impl FromRequestParts<AppState> for BoundStory {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let not_found = || ApiError::not_found("Story not found");

        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| not_found())?;
        let id: i64 = raw_id.parse().map_err(|_| not_found())?;

        state
            .store
            .find_with_owner(id)
            .await?
            .map(BoundStory)
            .ok_or_else(not_found)
    }
}
