use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;

use super::format_document;
use super::Repl;
use crate::domain::models::Document;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentStatus;
use crate::domain::models::Event;
use crate::domain::models::RemoteStore;
use crate::domain::services::Workspace;
use crate::infrastructure::remotes::memory::MemoryRemote;

fn repl(remote: &Arc<MemoryRemote>) -> (Repl, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let workspace = Workspace::new(remote.clone(), Duration::from_millis(2000), tx);
    return (Repl::new(workspace), rx);
}

async fn drain(
    repl: &mut Repl,
    rx: &mut mpsc::UnboundedReceiver<Event>,
    out: &mut Vec<u8>,
) -> Result<()> {
    while !repl.workspace().is_settled() {
        match rx.recv().await {
            Some(event) => repl.handle_event(event, out)?,
            None => bail!("Event channel closed"),
        }
    }

    return Ok(());
}

fn text(out: &[u8]) -> String {
    return String::from_utf8_lossy(out).to_string();
}

#[test]
fn it_formats_documents() {
    let mut document = Document::new("Groceries", serde_json::json!({}));
    assert_eq!(
        format_document(&document, false),
        "- (ID: unsaved) Groceries, Status: draft"
    );

    document.id = Some(DocumentId::new("4"));
    document.status = DocumentStatus::Published;
    document.updated_at = Some("2024-01-15T10:30:00Z".to_string());
    assert_eq!(
        format_document(&document, true),
        "* (ID: 4) Groceries, Status: published, Updated: 2024-01-15T10:30:00Z"
    );
}

#[tokio::test(start_paused = true)]
async fn it_appends_plain_lines_and_saves_on_quit() -> Result<()> {
    let remote = Arc::new(MemoryRemote::default());
    let (mut repl, mut rx) = repl(&remote);
    let mut out = vec![];

    assert!(repl.handle_line("/new Groceries", &mut out).await?);
    assert!(repl.handle_line("Eggs", &mut out).await?);
    assert!(repl.handle_line("/title Weekly groceries", &mut out).await?);
    assert!(text(&out).contains("Unsaved changes"));

    assert!(!repl.handle_line("/quit", &mut out).await?);
    repl.shutdown(&mut rx, &mut out).await?;

    let updates = remote.updates().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1.title, Some("Weekly groceries".to_string()));

    let id = DocumentId::new("1");
    let saved = remote.fetch(&id).await?;
    assert_eq!(saved.title, "Weekly groceries");
    assert!(text(&out).contains("Saved"));

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_refuses_unknown_commands() -> Result<()> {
    let remote = Arc::new(MemoryRemote::default());
    let (mut repl, _rx) = repl(&remote);
    let mut out = vec![];
    repl.handle_line("/new", &mut out).await?;

    let err = repl.handle_line("/bold everything", &mut out).await.unwrap_err();
    assert!(err.to_string().starts_with("Unknown command."));

    repl.handle_line("/append /bold everything", &mut out).await?;
    assert_eq!(repl.workspace().editor().plain_text(), "\n/bold everything");

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_validates_statuses() -> Result<()> {
    let remote = Arc::new(MemoryRemote::default());
    let (mut repl, _rx) = repl(&remote);
    let mut out = vec![];
    repl.handle_line("/n Notes", &mut out).await?;

    let err = repl.handle_line("/status archived", &mut out).await.unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"Status must be draft or published.");

    repl.handle_line("/s published", &mut out).await?;
    assert_eq!(
        repl.workspace().store().active().map(|doc| return doc.status),
        Some(DocumentStatus::Published)
    );

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_marks_the_open_document_in_lists() -> Result<()> {
    let remote = Arc::new(MemoryRemote::default());
    let (mut repl, _rx) = repl(&remote);
    let mut out = vec![];

    repl.handle_line("/list", &mut out).await?;
    assert!(text(&out).contains("There are no documents yet."));

    repl.handle_line("/new First", &mut out).await?;
    repl.handle_line("/new Second", &mut out).await?;
    repl.handle_line("/open 1", &mut out).await?;

    let mut out = vec![];
    repl.handle_line("/l", &mut out).await?;
    let listed = text(&out);
    assert!(listed.contains("- (ID: 2) Second"));
    assert!(listed.contains("* (ID: 1) First"));

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_streams_answers_and_inserts_them() -> Result<()> {
    let remote = Arc::new(MemoryRemote::default().with_reply(&["A cat ", "sat."]));
    let (mut repl, mut rx) = repl(&remote);
    let mut out = vec![];
    repl.handle_line("/new Cats", &mut out).await?;

    let mut out = vec![];
    repl.handle_line("/ask draw a cat", &mut out).await?;
    drain(&mut repl, &mut rx, &mut out).await?;

    let printed = text(&out);
    assert!(printed.starts_with("Assistant: A cat sat.\n"));
    assert!(printed.contains("/insert"));

    repl.handle_line("/insert", &mut out).await?;
    assert_eq!(repl.workspace().editor().plain_text(), "\nA cat sat.");

    repl.shutdown(&mut rx, &mut out).await?;
    assert_eq!(remote.updates().await.len(), 1);

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_prints_stream_failures() -> Result<()> {
    let remote = Arc::new(
        MemoryRemote::default()
            .with_reply(&["A "])
            .with_reply_failure("connection reset"),
    );
    let (mut repl, mut rx) = repl(&remote);
    let mut out = vec![];

    repl.handle_line("/a draw a cat", &mut out).await?;
    drain(&mut repl, &mut rx, &mut out).await?;

    assert!(text(&out).contains("Sorry, I encountered an error. Please try again."));
    assert!(repl.handle_line("/insert", &mut out).await.is_err());

    return Ok(());
}

#[tokio::test]
async fn it_fails_to_attach_missing_images() -> Result<()> {
    let remote = Arc::new(MemoryRemote::default());
    let (mut repl, _rx) = repl(&remote);
    let mut out = vec![];

    let res = repl
        .handle_line("/image ./test/does-not-exist.png", &mut out)
        .await;
    assert!(res.is_err());
    assert!(repl.handle_line("/img", &mut out).await.is_err());

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_holds_answers_until_a_document_is_open() -> Result<()> {
    let remote = Arc::new(MemoryRemote::default().with_reply(&["Title ideas"]));
    let (mut repl, mut rx) = repl(&remote);
    let mut out = vec![];
    repl.handle_line("/new Ideas", &mut out).await?;
    repl.handle_line("/open", &mut out).await?;
    assert!(repl.workspace().store().active().is_none());

    repl.handle_line("/ask give me titles", &mut out).await?;
    drain(&mut repl, &mut rx, &mut out).await?;

    let mut out = vec![];
    repl.handle_line("/insert", &mut out).await?;
    assert!(text(&out).contains("1 answer(s) will be inserted once a document is open."));

    repl.handle_line("/o 1", &mut out).await?;
    assert_eq!(repl.workspace().editor().plain_text(), "\nTitle ideas");
    assert_eq!(repl.workspace().queued_insertions(), 0);

    return Ok(());
}
