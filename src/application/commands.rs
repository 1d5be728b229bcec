#[cfg(test)]
#[path = "commands_test.rs"]
mod tests;

use std::io;
use std::path;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use tokio::fs;
use tokio::sync::mpsc;
use yansi::Paint;

use super::cli::Invocation;
use super::repl;
use super::repl::Repl;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::DocumentStatus;
use crate::domain::models::EditorSurface;
use crate::domain::models::Event;
use crate::domain::models::RemoteBox;
use crate::domain::models::SaveStatus;
use crate::domain::services::Workspace;

pub async fn read_content(path: &path::Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path).await?;
    let content = serde_json::from_str::<serde_json::Value>(&text)?;

    // Content the editor cannot open is refused before it reaches the store.
    EditorSurface::load(&content)?;

    return Ok(content);
}

async fn health_banner(workspace: &Workspace) {
    let remote = workspace.remote();
    match remote.health_check().await {
        Ok(()) => {
            println!(
                "{}",
                Paint::green(format!("Connected to the {} document store.", remote.name()))
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "Document store health check failed");
            println!(
                "{}",
                Paint::yellow(format!("Document store is unavailable: {err}"))
            );
        }
    }
}

fn pick_document(workspace: &Workspace) -> Result<Option<DocumentId>> {
    let documents = workspace.store().documents();
    if documents.is_empty() {
        return Ok(None);
    }

    let items = documents
        .iter()
        .map(|document| return repl::format_document(document, false))
        .collect::<Vec<String>>();

    let selected = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Pick a document to open, escape to skip")
        .default(0)
        .items(&items)
        .interact_opt()?;

    return Ok(selected
        .and_then(|idx| return documents.get(idx))
        .and_then(|document| return document.id.clone()));
}

/// Sends whatever is pending and waits for it. Fails when a save failed.
async fn finish_saves(
    workspace: &mut Workspace,
    rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<SaveStatus> {
    workspace.flush_pending();
    workspace.settle(rx).await?;

    let status = workspace.save_status();
    if status == SaveStatus::Error {
        bail!("Failed to save the document, see the debug log for details");
    }

    return Ok(status);
}

pub fn edit_patch(
    title: Option<String>,
    content: Option<serde_json::Value>,
    status: Option<DocumentStatus>,
) -> Result<DocumentPatch> {
    let mut patch = DocumentPatch::default();
    if let Some(title) = title {
        patch = patch.with_title(&title);
    }
    if let Some(content) = content {
        patch = patch.with_content(content);
    }
    if let Some(status) = status {
        patch = patch.with_status(status);
    }

    if patch.is_empty() {
        bail!("Nothing to change. Pass --title, --content-file or --status.");
    }

    return Ok(patch);
}

async fn ask<W: io::Write>(
    repl: &mut Repl,
    rx: &mut mpsc::UnboundedReceiver<Event>,
    prompt: &str,
    image: Option<path::PathBuf>,
    insert_into: Option<DocumentId>,
    out: &mut W,
) -> Result<()> {
    if let Some(id) = &insert_into {
        repl.workspace_mut().open(id).await?;
    }
    if let Some(image) = image {
        repl.attach(repl::load_image(&image).await?);
    }

    repl.ask(prompt, out)?;
    while repl.workspace().conversation().is_busy() {
        match rx.recv().await {
            Some(event) => repl.handle_event(event, out)?,
            None => bail!("Event channel closed while the assistant was answering"),
        }
    }

    if insert_into.is_none() {
        return Ok(());
    }

    repl.workspace_mut().insert_last_response()?;
    let status = finish_saves(repl.workspace_mut(), rx).await?;
    writeln!(out, "{}", status.label())?;

    return Ok(());
}

/// Runs one command line invocation against the remote store.
pub async fn run(invocation: Invocation, remote: RemoteBox, debounce: Duration) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut workspace = Workspace::new(remote, debounce, tx);

    match invocation {
        Invocation::List => {
            workspace.load().await?;
            let documents = workspace.store().documents();
            if documents.is_empty() {
                println!("There are no documents yet. Create one with `quill new`.");
            }
            for document in documents {
                println!("{}", repl::format_document(document, false));
            }
        }
        Invocation::New { title } => {
            let id = workspace.create_document(&title).await?;
            println!("{id}");
        }
        Invocation::Edit {
            id,
            title,
            content_file,
            status,
        } => {
            let content = match content_file {
                Some(path) => Some(read_content(&path).await?),
                None => None,
            };
            let patch = edit_patch(title, content, status)?;

            workspace.open(&id).await?;
            workspace.edit(patch)?;
            let status = finish_saves(&mut workspace, &mut rx).await?;
            println!("{}", status.label());
        }
        Invocation::Delete { id } => {
            let removed = workspace.delete_document(&id).await?;
            println!("Deleted {}", removed.display_title());
        }
        Invocation::Ask {
            prompt,
            image,
            insert_into,
        } => {
            let mut repl = Repl::new(workspace);
            ask(
                &mut repl,
                &mut rx,
                &prompt,
                image,
                insert_into,
                &mut io::stdout(),
            )
            .await?;
        }
        Invocation::Open { id } => {
            health_banner(&workspace).await;
            if let Err(err) = workspace.load().await {
                println!("{}", Paint::red(format!("Failed to load documents: {err}")));
            }

            let id = match id {
                Some(id) => Some(id),
                None => pick_document(&workspace)?,
            };
            if let Some(id) = id {
                let document = workspace.open(&id).await?;
                println!("Opened {}", document.display_title());
            }

            repl::start(Repl::new(workspace), &mut rx).await?;
        }
    }

    return Ok(());
}
