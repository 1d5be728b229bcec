use anyhow::Result;
use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;

use super::HttpRemote;
use crate::domain::models::AssistantPrompt;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::DocumentStatus;
use crate::domain::models::ImageAttachment;
use crate::domain::models::RemoteStore;
use crate::domain::models::SyncError;

impl HttpRemote {
    fn with_url(url: String) -> HttpRemote {
        return HttpRemote {
            url,
            timeout: "200".to_string(),
            client: reqwest::Client::new(),
        };
    }
}

fn record(id: &str, title: &str) -> serde_json::Value {
    return test_utils::record(id, title);
}

#[tokio::test]
async fn it_successfully_health_checks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/posts/")
        .with_status(200)
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let res = remote.health_check().await;

    assert!(res.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn it_fails_health_checks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/posts/")
        .with_status(500)
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let res = remote.health_check().await;

    assert_eq!(
        res,
        Err(SyncError::remote_status(500, "Document API health check failed"))
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn it_creates_a_draft_and_unwraps_the_record() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/posts/")
        .match_body(Matcher::PartialJson(json!({
            "title": "Untitled Page",
            "status": "draft",
            "content": {"root": {"type": "root"}},
        })))
        .with_status(200)
        .with_body(json!({"data": [record("65a1", "Untitled Page")], "code": 200}).to_string())
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let document = remote
        .create("Untitled Page", json!({"root": {"type": "root"}}))
        .await?;

    assert_eq!(document.id, Some(DocumentId::new("65a1")));
    assert_eq!(document.title, "Untitled Page");
    assert_eq!(document.status, DocumentStatus::Draft);
    mock.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_fails_create_on_server_errors() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/posts/")
        .with_status(500)
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let res = remote.create("Notes", json!({})).await;

    assert_eq!(
        res,
        Err(SyncError::remote_status(500, "Internal Server Error"))
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn it_lists_documents() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/posts/")
        .with_status(200)
        .with_body(
            json!({
                "data": [[record("1", "First"), {"title": "no id here", "status": "lost"}, record("2", "Second")]],
                "code": 200,
                "message": "Posts data retrieved successfully",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let titles = remote
        .fetch_all()
        .await?
        .into_iter()
        .map(|doc| return doc.title)
        .collect::<Vec<String>>();

    assert_eq!(titles, vec!["First", "Second"]);
    mock.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_degrades_unexpected_list_shapes_to_empty() -> Result<()> {
    for body in ["{\"data\": []}", "{\"items\": [1, 2]}", "not json at all", "{\"data\": [[]]}"] {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/posts/")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let remote = HttpRemote::with_url(server.url());
        assert!(remote.fetch_all().await?.is_empty(), "body: {body}");
    }

    return Ok(());
}

#[tokio::test]
async fn it_accepts_numeric_ids() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/posts/7")
        .with_status(200)
        .with_body(json!({"data": [{"id": 7, "title": "Seven", "content": {}, "status": "published"}]}).to_string())
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let document = remote.fetch(&DocumentId::new("7")).await?;

    assert_eq!(document.id, Some(DocumentId::new("7")));
    assert_eq!(document.status, DocumentStatus::Published);

    return Ok(());
}

#[tokio::test]
async fn it_maps_envelope_errors_on_fetch() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/posts/404")
        .with_status(200)
        .with_body(
            json!({"error": "An error occurred.", "code": 404, "message": "Post doesn't exist."})
                .to_string(),
        )
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let res = remote.fetch(&DocumentId::new("404")).await;

    assert_eq!(
        res,
        Err(SyncError::remote_status(404, "Post doesn't exist."))
    );
}

#[tokio::test]
async fn it_sends_partial_updates() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/posts/abc")
        .match_body(Matcher::Json(json!({"title": "Hi"})))
        .with_status(200)
        .with_body(json!({"data": ["Post with ID: abc name update is successful"], "code": 200}).to_string())
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    remote
        .update(&DocumentId::new("abc"), &DocumentPatch::title("Hi"))
        .await?;

    mock.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_fails_updates_reported_in_the_envelope() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/posts/abc")
        .with_status(200)
        .with_body(
            json!({"error": "An error occurred", "code": 404, "message": "There was an error updating the post data."})
                .to_string(),
        )
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let res = remote
        .update(
            &DocumentId::new("abc"),
            &DocumentPatch::status(DocumentStatus::Published),
        )
        .await;

    assert!(matches!(res, Err(SyncError::Remote { .. })));
}

#[tokio::test]
async fn it_deletes_documents() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/posts/abc")
        .with_status(200)
        .with_body(json!({"data": ["Post with ID: abc removed"], "code": 200}).to_string())
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    remote.delete(&DocumentId::new("abc")).await?;

    mock.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_streams_generations() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ai/generate")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("name=\"prompt\"".to_string()),
            Matcher::Regex("draw a cat".to_string()),
            Matcher::Regex("filename=\"cat.png\"".to_string()),
        ]))
        .with_status(200)
        .with_body("A cat sat.")
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let prompt = AssistantPrompt::new(
        "draw a cat",
        Some(ImageAttachment::new("cat.png", b"fake image".to_vec())),
    );

    let mut source = remote.generate(prompt).await?;
    let mut bytes = vec![];
    while let Some(chunk) = source.next().await {
        bytes.extend(chunk?);
    }

    assert_eq!(String::from_utf8(bytes)?, "A cat sat.");
    mock.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_surfaces_generation_handshake_details() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/ai/generate")
        .with_status(429)
        .with_body(
            json!({"detail": "AI usage limit reached. Please wait about 30 seconds and try again."})
                .to_string(),
        )
        .create_async()
        .await;

    let remote = HttpRemote::with_url(server.url());
    let res = remote.generate(AssistantPrompt::new("hi", None)).await;

    match res {
        Err(err) => assert_eq!(
            err,
            SyncError::remote_status(
                429,
                "AI usage limit reached. Please wait about 30 seconds and try again."
            )
        ),
        Ok(_) => panic!("handshake should have failed"),
    }
}
