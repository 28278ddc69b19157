mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{request, text, TestApp, BASE_URL};

#[tokio::test]
async fn create_story_returns_201_with_owner() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app
        .post_form("/api/stories", 1, vec![text("title", "Hello"), text("content", "World")])
        .await?;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "Story created successfully");
    assert_eq!(body["data"]["title"], "Hello");
    assert_eq!(body["data"]["content"], "World");
    assert_eq!(body["data"]["user_id"], 1);
    assert!(body["data"]["image"].is_null());
    assert!(body["data"]["image_url"].is_null());
    assert_eq!(body["data"]["user"]["id"], 1);
    assert_eq!(body["data"]["user"]["name"], "Alice");

    let id = body["data"]["id"].as_i64().unwrap();
    let stored = app.store.story(id).unwrap();
    assert_eq!(stored.user_id, 1);
    Ok(())
}

#[tokio::test]
async fn create_story_accepts_json_body() -> Result<()> {
    let app = TestApp::new()?;

    let request = request(Method::POST, "/api/stories", Some(&app.token(2)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "title": "From JSON", "content": "Body" }).to_string()))?;
    let (status, body) = app.send(request).await?;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["user_id"], 2);
    assert_eq!(body["data"]["title"], "From JSON");
    Ok(())
}

#[tokio::test]
async fn create_without_fields_is_422_and_inserts_nothing() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.post_form("/api/stories", 1, vec![text("title", "   ")]).await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], false);
    assert_eq!(body["message"], "The title field is required. (and 1 more error)");
    assert_eq!(body["errors"]["title"], json!(["The title field is required."]));
    assert_eq!(body["errors"]["content"], json!(["The content field is required."]));
    assert_eq!(app.store.story_count(), 0);
    Ok(())
}

#[tokio::test]
async fn title_longer_than_255_characters_is_rejected() -> Result<()> {
    let app = TestApp::new()?;

    let long_title = "x".repeat(256);
    let (status, body) = app
        .post_form("/api/stories", 1, vec![text("title", &long_title), text("content", "c")])
        .await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["title"],
        json!(["The title field must not be greater than 255 characters."])
    );
    assert!(body["errors"].get("content").is_none());
    Ok(())
}

#[tokio::test]
async fn requests_without_token_are_401() -> Result<()> {
    let app = TestApp::new()?;

    for (method, uri) in [
        (Method::GET, "/api/stories"),
        (Method::GET, "/api/my-stories"),
        (Method::POST, "/api/stories"),
        (Method::GET, "/api/stories/1"),
        (Method::DELETE, "/api/stories/1"),
    ] {
        let (status, body) = app.send(request(method, uri, None).body(Body::empty())?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body, json!({ "status": false, "message": "Unauthenticated." }));
    }
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_user_is_401() -> Result<()> {
    let app = TestApp::new()?;

    let (status, _) = app.get("/api/stories", 99).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_401() -> Result<()> {
    let app = TestApp::new()?;

    let request = request(Method::GET, "/api/stories", Some("not-a-jwt")).body(Body::empty())?;
    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], false);
    Ok(())
}

#[tokio::test]
async fn show_returns_story_with_owner() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(2, "Bob's tale", 5);

    // Any authenticated user may read
    let (status, body) = app.get(&format!("/api/stories/{}", story.id), 1).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], story.id);
    assert_eq!(body["data"]["user"]["id"], 2);
    assert_eq!(body["data"]["user"]["name"], "Bob");
    Ok(())
}

#[tokio::test]
async fn unknown_or_malformed_id_is_404() -> Result<()> {
    let app = TestApp::new()?;
    app.store.seed_story(1, "only", 1);

    for uri in ["/api/stories/999", "/api/stories/abc"] {
        let (status, body) = app.get(uri, 1).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["message"], "Story not found");

        let (status, _) = app.delete(uri, 1).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
    Ok(())
}

#[tokio::test]
async fn owner_can_update() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(1, "Draft", 5);

    let (status, body) = app
        .post_form(
            &format!("/api/stories/{}", story.id),
            1,
            vec![text("title", "Final"), text("content", "Polished")],
        )
        .await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Story updated successfully");
    assert_eq!(body["data"]["title"], "Final");
    assert_eq!(body["data"]["user"]["id"], 1);

    let stored = app.store.story(story.id).unwrap();
    assert_eq!(stored.title, "Final");
    assert_eq!(stored.content, "Polished");
    Ok(())
}

#[tokio::test]
async fn non_owner_update_is_403_and_changes_nothing() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(1, "Mine", 5);

    let (status, body) = app
        .post_form(
            &format!("/api/stories/{}", story.id),
            2,
            vec![text("title", "Hijacked"), text("content", "x")],
        )
        .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "status": false, "message": "Unauthorized" }));
    assert_eq!(app.store.story(story.id).unwrap(), story);
    Ok(())
}

#[tokio::test]
async fn ownership_is_checked_before_validation() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(1, "Mine", 5);

    // Invalid input from a non-owner still reports 403
    let (status, _) = app.post_form(&format!("/api/stories/{}", story.id), 2, vec![]).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner with the same input gets 422
    let (status, body) = app.post_form(&format!("/api/stories/{}", story.id), 1, vec![]).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["title"].is_array());
    assert_eq!(app.store.story(story.id).unwrap(), story);
    Ok(())
}

#[tokio::test]
async fn non_owner_delete_is_403_and_story_survives() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(1, "Mine", 5);

    let (status, body) = app.delete(&format!("/api/stories/{}", story.id), 2).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized");
    assert!(app.store.story(story.id).is_some());
    Ok(())
}

#[tokio::test]
async fn owner_delete_then_show_is_404() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(1, "Short-lived", 5);
    let uri = format!("/api/stories/{}", story.id);

    let (status, body) = app.delete(&uri, 1).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": true, "message": "Story deleted successfully" }));

    let (status, _) = app.get(&uri, 1).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn failed_write_is_500_without_leaking_details() -> Result<()> {
    let app = TestApp::new()?;
    app.store.fail_writes(true);

    let (status, body) = app
        .post_form("/api/stories", 1, vec![text("title", "t"), text("content", "c")])
        .await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Database error occurred");
    assert_eq!(app.store.story_count(), 0);
    Ok(())
}

#[tokio::test]
async fn list_all_is_newest_first_and_paginated() -> Result<()> {
    let app = TestApp::new()?;
    for i in 0..12 {
        app.store.seed_story(1, &format!("alice-{}", i), 100 - i);
    }
    for i in 0..3 {
        app.store.seed_story(2, &format!("bob-{}", i), 50 - i);
    }

    let (status, body) = app.get("/api/stories", 1).await?;
    assert_eq!(status, StatusCode::OK);

    let page = &body["data"];
    let items = page["data"].as_array().unwrap();
    assert_eq!(items.len(), 10);
    assert_eq!(page["total"], 15);
    assert_eq!(page["per_page"], 10);
    assert_eq!(page["current_page"], 1);
    assert_eq!(page["last_page"], 2);
    assert_eq!(page["path"], format!("{}/api/stories", BASE_URL));
    assert_eq!(page["next_page_url"], format!("{}/api/stories?page=2", BASE_URL));
    assert!(page["prev_page_url"].is_null());

    // Bob's stories are the newest
    assert_eq!(items[0]["title"], "bob-2");
    assert_eq!(items[0]["user"]["name"], "Bob");
    let times: Vec<&str> = items.iter().map(|s| s["created_at"].as_str().unwrap()).collect();
    let mut sorted = times.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(times, sorted);

    let (_, body) = app.get("/api/stories?page=2", 1).await?;
    let page = &body["data"];
    assert_eq!(page["data"].as_array().unwrap().len(), 5);
    assert_eq!(page["from"], 11);
    assert_eq!(page["to"], 15);
    assert!(page["next_page_url"].is_null());
    Ok(())
}

#[tokio::test]
async fn out_of_range_page_is_empty_and_bad_page_means_first() -> Result<()> {
    let app = TestApp::new()?;
    app.store.seed_story(1, "one", 1);

    let (status, body) = app.get("/api/stories?page=9", 1).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"], json!([]));
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = app.get("/api/stories?page=abc", 1).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_page"], 1);
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn my_stories_only_returns_callers_stories() -> Result<()> {
    let app = TestApp::new()?;
    for i in 0..4 {
        app.store.seed_story(1, &format!("alice-{}", i), 20 - i);
    }
    for i in 0..3 {
        app.store.seed_story(2, &format!("bob-{}", i), 10 - i);
    }

    let (status, body) = app.get("/api/my-stories", 2).await?;
    assert_eq!(status, StatusCode::OK);

    let page = &body["data"];
    let items = page["data"].as_array().unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|s| s["user_id"] == 2));
    assert!(items.iter().all(|s| s.get("user").is_none()));
    assert_eq!(items[0]["title"], "bob-2");
    assert_eq!(page["path"], format!("{}/api/my-stories", BASE_URL));

    let (_, body) = app.get("/api/my-stories", 1).await?;
    assert_eq!(body["data"]["total"], 4);
    Ok(())
}

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.send(request(Method::GET, "/health", None).body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = app.send(request(Method::GET, "/", None).body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Story API");
    Ok(())
}

#[tokio::test]
async fn non_owner_with_malformed_body_is_403() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(1, "Mine", 5);

    let request = request(Method::POST, &format!("/api/stories/{}", story.id), Some(&app.token(2)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{"))?;
    let (status, body) = app.send(request).await?;

    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body, json!({ "status": false, "message": "Unauthorized" }));
    assert_eq!(app.store.story(story.id).unwrap(), story);
    Ok(())
}

#[tokio::test]
async fn unparseable_json_counts_as_empty_input() -> Result<()> {
    let app = TestApp::new()?;

    for raw in ["", "{", "[1, 2]"] {
        let request = request(Method::POST, "/api/stories", Some(&app.token(1)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))?;
        let (status, body) = app.send(request).await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{:?}: {}", raw, body);
        assert_eq!(body["errors"]["title"], json!(["The title field is required."]));
        assert_eq!(body["errors"]["content"], json!(["The content field is required."]));
    }
    assert_eq!(app.store.story_count(), 0);
    Ok(())
}

#[tokio::test]
async fn owner_with_malformed_body_is_422() -> Result<()> {
    let app = TestApp::new()?;
    let story = app.store.seed_story(1, "Mine", 5);

    let request = request(Method::POST, &format!("/api/stories/{}", story.id), Some(&app.token(1)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{"))?;
    let (status, body) = app.send(request).await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
    assert_eq!(app.store.story(story.id).unwrap(), story);
    Ok(())
}
