// handlers/protected/stories.rs - story CRUD
//
// GET    /api/stories       list-all, newest first, 10 per page, owner embedded
// GET    /api/my-stories    caller's stories, newest first, 10 per page
// POST   /api/stories       create (caller becomes owner)
// GET    /api/stories/:id   show
// POST   /api/stories/:id   update (owner only)
// DELETE /api/stories/:id   destroy (owner only)

use axum::extract::{FromRequest, OriginalUri, Query, Request, State};
use axum::Extension;
use tracing::{info, warn};

use crate::app::AppState;
use crate::database::models::{NewStory, Story, StoryChanges, StoryResource, StoryWithOwner};
use crate::database::StoryScope;
use crate::error::ApiError;
use crate::extract::{BoundStory, StoryForm};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::pagination::{Page, PageQuery, PER_PAGE};
use crate::storage::{Disk, STORIES_DIRECTORY};
use crate::validation::StoryInput;

/// GET /api/stories
pub async fn index(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<StoryResource>> {
    let request = query.request(PER_PAGE);
    let scope = StoryScope::All;

    let total = state.store.count(scope).await?;
    let rows = state.store.latest(scope, request.per_page, request.offset()).await?;

    let data = rows
        .into_iter()
        .map(|row| StoryResource::with_owner(row, state.public_base()))
        .collect();

    let path = format!("{}{}", state.public_base(), uri.path());
    Ok(ApiResponse::success(Page::new(data, total, request, path)))
}

/// GET /api/my-stories
pub async fn my_stories(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<StoryResource>> {
    let request = query.request(PER_PAGE);
    let scope = StoryScope::OwnedBy(caller.id);

    let total = state.store.count(scope).await?;
    let rows = state.store.latest(scope, request.per_page, request.offset()).await?;

    let data = rows
        .into_iter()
        .map(|row| StoryResource::new(row.story, state.public_base()))
        .collect();

    let path = format!("{}{}", state.public_base(), uri.path());
    Ok(ApiResponse::success(Page::new(data, total, request, path)))
}

/// POST /api/stories
pub async fn store(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    StoryForm(form): StoryForm,
) -> ApiResult<StoryResource> {
    let input = StoryInput::from_form(&form).map_err(ApiError::validation)?;

    let image = match input.image {
        Some(upload) => Some(
            state
                .disk
                .store(STORIES_DIRECTORY, upload.bytes, upload.extension)
                .await?,
        ),
        None => None,
    };

    let new_story = NewStory {
        user_id: caller.id,
        title: input.title,
        content: input.content,
        image: image.clone(),
    };

    let story = match state.store.insert(new_story).await {
        Ok(story) => story,
        Err(e) => {
            if let Some(path) = image.as_deref() {
                discard_file(state.disk.as_ref(), path).await;
            }
            return Err(e.into());
        }
    };

    info!("User {} created story {}", caller.id, story.id);

    let loaded = reload(&state, story.id).await?;
    Ok(ApiResponse::created(StoryResource::with_owner(loaded, state.public_base()))
        .with_message("Story created successfully"))
}

/// GET /api/stories/:id
pub async fn show(State(state): State<AppState>, BoundStory(loaded): BoundStory) -> ApiResult<StoryResource> {
    Ok(ApiResponse::success(StoryResource::with_owner(loaded, state.public_base())))
}

/// POST /api/stories/:id
///
/// Ownership is checked before the body is read. A replacement image is
/// stored before the row is updated; the old file is removed only once the
/// row points at the new one.
pub async fn update(
    State(state): State<AppState>,
    BoundStory(loaded): BoundStory,
    Extension(caller): Extension<AuthUser>,
    request: Request,
) -> ApiResult<StoryResource> {
    let story = loaded.story;
    authorize_owner(&story, &caller)?;

    let StoryForm(form) = StoryForm::from_request(request, &state).await?;
    let input = StoryInput::from_form(&form).map_err(ApiError::validation)?;

    let new_image = match input.image {
        Some(upload) => Some(
            state
                .disk
                .store(STORIES_DIRECTORY, upload.bytes, upload.extension)
                .await?,
        ),
        None => None,
    };

    let changes = StoryChanges {
        title: input.title,
        content: input.content,
        image: new_image.clone(),
    };

    if let Err(e) = state.store.update(story.id, changes).await {
        if let Some(path) = new_image.as_deref() {
            discard_file(state.disk.as_ref(), path).await;
        }
        return Err(e.into());
    }

    if new_image.is_some() {
        if let Some(old) = story.image.as_deref() {
            discard_file(state.disk.as_ref(), old).await;
        }
    }

    info!("User {} updated story {}", caller.id, story.id);

    let fresh = reload(&state, story.id).await?;
    Ok(ApiResponse::success(StoryResource::with_owner(fresh, state.public_base()))
        .with_message("Story updated successfully"))
}

/// DELETE /api/stories/:id
pub async fn destroy(
    State(state): State<AppState>,
    BoundStory(loaded): BoundStory,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<()> {
    let story = loaded.story;
    authorize_owner(&story, &caller)?;

    // Row first: a failed file delete leaves an orphan file, never a dangling path
    state.store.delete(story.id).await?;

    if let Some(path) = story.image.as_deref() {
        discard_file(state.disk.as_ref(), path).await;
    }

    info!("User {} deleted story {}", caller.id, story.id);

    Ok(ApiResponse::message("Story deleted successfully"))
}

fn authorize_owner(story: &Story, caller: &AuthUser) -> Result<(), ApiError> {
    if story.is_owned_by(caller.id) {
        return Ok(());
    }
    warn!(
        "User {} denied access to story {} owned by {}",
        caller.id, story.id, story.user_id
    );
    Err(ApiError::forbidden("Unauthorized"))
}

async fn reload(state: &AppState, id: i64) -> Result<StoryWithOwner, ApiError> {
    state
        .store
        .find_with_owner(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Story not found"))
}

/// Best-effort removal; failures are logged and swallowed.
async fn discard_file(disk: &dyn Disk, path: &str) {
    match disk.delete(path).await {
        Ok(true) => {}
        Ok(false) => warn!("Stored file {} was already missing", path),
        Err(e) => warn!("Failed to delete stored file {}: {}", path, e),
    }
}
