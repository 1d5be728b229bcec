#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::io;
use std::io::Write;
use std::path;

use anyhow::bail;
use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::domain::models::AssistantPrompt;
use crate::domain::models::Author;
use crate::domain::models::Document;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::DocumentStatus;
use crate::domain::models::Event;
use crate::domain::models::ImageAttachment;
use crate::domain::models::MessageType;
use crate::domain::models::SaveStatus;
use crate::domain::models::SlashCommand;
use crate::domain::services::Workspace;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /list (/l) - Lists all documents. The open one is marked with *.
- /open (/o) [DOCUMENT_ID?] - Opens a document for editing, or closes the open one when no ID is passed.
- /new (/n) [TITLE?] - Creates a document and opens it.
- /title (/t) [TITLE] - Renames the open document.
- /status (/s) [draft,published] - Sets the publication status of the open document.
- /show (/p) - Prints the open document.
- /append (/ap) [TEXT] - Appends a paragraph, even one starting with a slash. Plain lines do the same.
- /save (/w) - Saves the open document now instead of waiting for autosave.
- /delete (/d) [DOCUMENT_ID?] - Deletes a document, the open one when no ID is passed.
- /ask (/a) [PROMPT] - Asks the writing assistant. The answer streams in below.
- /image (/img) [PATH] - Attaches an image to the next /ask.
- /insert (/i) - Appends the last assistant answer to the open document.
- /close (/x) - Stops the answer currently streaming in.
- /quit /exit (/q) - Saves pending edits and exits Quill.
- /help (/h) - Provides this help menu.
        "#;

    return text.trim().to_string();
}

pub fn format_document(document: &Document, active: bool) -> String {
    let marker = if active { "*" } else { "-" };
    let id = document
        .id
        .as_ref()
        .map(|id| return id.to_string())
        .unwrap_or_else(|| return "unsaved".to_string());

    let mut res = format!(
        "{marker} (ID: {id}) {}, Status: {}",
        document.display_title(),
        document.status
    );
    if let Some(updated_at) = &document.updated_at {
        res = format!("{res}, Updated: {updated_at}");
    }

    return res;
}

pub async fn load_image(path: &path::Path) -> Result<ImageAttachment> {
    let bytes = fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| return name.to_string_lossy().to_string())
        .unwrap_or_else(|| return "image".to_string());

    return Ok(ImageAttachment::new(&file_name, bytes));
}

/// Line-oriented editing session on top of a workspace. Input lines and
/// workspace events are fed in by the caller, output goes to any writer.
pub struct Repl {
    workspace: Workspace,
    image: Option<ImageAttachment>,
    printed: usize,
    last_status: SaveStatus,
}

impl Repl {
    pub fn new(workspace: Workspace) -> Repl {
        let last_status = workspace.save_status();
        return Repl {
            workspace,
            image: None,
            printed: 0,
            last_status,
        };
    }

    pub fn workspace(&self) -> &Workspace {
        return &self.workspace;
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        return &mut self.workspace;
    }

    fn active_id(&self) -> Result<DocumentId> {
        match self.workspace.store().active_id() {
            Some(id) => return Ok(id.clone()),
            None => bail!("No document is open. Use /open or /new first."),
        }
    }

    fn report_status<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let status = self.workspace.save_status();
        if status == self.last_status {
            return Ok(());
        }

        self.last_status = status;
        let label = match status {
            SaveStatus::Error => Paint::red(status.label()).to_string(),
            SaveStatus::Saved => Paint::green(status.label()).to_string(),
            _ => Paint::yellow(status.label()).to_string(),
        };
        writeln!(out, "[{label}]")?;

        return Ok(());
    }

    pub fn attach(&mut self, image: ImageAttachment) {
        self.image = Some(image);
    }

    /// Sends a prompt, using the attached image if there is one.
    pub fn ask<W: Write>(&mut self, text: &str, out: &mut W) -> Result<()> {
        let prompt = AssistantPrompt::new(text, self.image.clone());
        self.workspace.submit_prompt(prompt)?;
        self.image = None;
        self.printed = 0;
        write!(out, "{}: ", Author::Assistant.to_string())?;
        out.flush()?;

        return Ok(());
    }

    fn print_document<W: Write>(&self, out: &mut W) -> Result<()> {
        let document = match self.workspace.store().active() {
            Some(document) => document,
            None => bail!("No document is open. Use /open or /new first."),
        };

        writeln!(out, "{}", Paint::new(document.display_title()).bold())?;
        writeln!(
            out,
            "Status: {}, {}",
            document.status,
            self.workspace.save_status().label()
        )?;
        writeln!(out)?;
        writeln!(out, "{}", self.workspace.editor().plain_text())?;

        return Ok(());
    }

    fn print_list<W: Write>(&self, out: &mut W) -> Result<()> {
        let store = self.workspace.store();
        if store.documents().is_empty() {
            writeln!(out, "There are no documents yet. Create one with /new.")?;
            return Ok(());
        }

        for document in store.documents() {
            let active = document.id.is_some() && document.id.as_ref() == store.active_id();
            writeln!(out, "{}", format_document(document, active))?;
        }

        return Ok(());
    }

    /// Runs one input line. Returns false once the session should end.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        let res = self.run_line(line, out).await;
        self.report_status(out)?;
        return res;
    }

    async fn run_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }

        let command = match SlashCommand::parse(line) {
            Some(command) => command,
            None => {
                if line.trim_start().starts_with('/') {
                    bail!("Unknown command. Use /help to list commands, or /append to add text starting with a slash.");
                }
                self.workspace.append_paragraph(line)?;
                return Ok(true);
            }
        };

        if command.is_quit() {
            return Ok(false);
        }

        if command.is_help() {
            writeln!(out, "{}", help_text())?;
        } else if command.is_list() {
            self.print_list(out)?;
        } else if command.is_open() {
            let id = match command.first_arg() {
                Some(id) => DocumentId::new(id),
                None => {
                    self.workspace.close_document();
                    writeln!(out, "Closed the open document.")?;
                    return Ok(true);
                }
            };
            let document = self.workspace.open(&id).await?;
            writeln!(out, "Opened {}", document.display_title())?;
        } else if command.is_new() {
            let id = self.workspace.create_document(command.rest()).await?;
            writeln!(out, "Created document {id}")?;
        } else if command.is_title() {
            if command.rest().is_empty() {
                bail!("Pass the new title.");
            }
            self.workspace.edit(DocumentPatch::title(command.rest()))?;
        } else if command.is_status() {
            let status = command
                .first_arg()
                .and_then(DocumentStatus::parse);
            match status {
                Some(status) => self.workspace.edit(DocumentPatch::status(status))?,
                None => bail!("Status must be draft or published."),
            }
        } else if command.is_show() {
            self.print_document(out)?;
        } else if command.is_append() {
            self.workspace.append_paragraph(command.rest())?;
        } else if command.is_save() {
            self.workspace.save_now()?;
        } else if command.is_delete() {
            let id = match command.first_arg() {
                Some(id) => DocumentId::new(id),
                None => self.active_id()?,
            };
            let removed = self.workspace.delete_document(&id).await?;
            writeln!(out, "Deleted {}", removed.display_title())?;
        } else if command.is_ask() {
            self.ask(command.rest(), out)?;
        } else if command.is_image() {
            let path = match command.first_arg() {
                Some(path) => path::PathBuf::from(path),
                None => bail!("Pass the path of the image to attach."),
            };
            let image = load_image(&path).await?;
            writeln!(out, "Attached {} to the next /ask", image.file_name)?;
            self.attach(image);
        } else if command.is_insert() {
            let inserted = self.workspace.insert_last_response()?;
            if inserted == 0 {
                writeln!(
                    out,
                    "{} answer(s) will be inserted once a document is open.",
                    self.workspace.queued_insertions()
                )?;
            }
        } else if command.is_close() {
            if self.workspace.close_assistant() {
                writeln!(out)?;
                writeln!(out, "Stopped the assistant.")?;
            }
        }

        return Ok(true);
    }

    /// Applies a workspace event and prints what changed.
    pub fn handle_event<W: Write>(&mut self, event: Event, out: &mut W) -> Result<()> {
        let current = self.workspace.conversation().current_stream();
        let stream = match &event {
            Event::AssistantProgress { stream, .. }
            | Event::AssistantFinished { stream, .. }
            | Event::AssistantFailed { stream, .. } => Some(*stream),
            _ => None,
        };
        let finished = matches!(event, Event::AssistantFinished { .. });
        let failed = matches!(event, Event::AssistantFailed { .. });

        self.workspace.handle_event(event);

        if stream.is_some() && stream == Some(current) {
            let text = if finished {
                self.workspace
                    .conversation()
                    .messages
                    .last()
                    .map(|message| return message.text.to_string())
            } else {
                self.workspace
                    .conversation()
                    .pending()
                    .map(|pending| return pending.accumulated_text.to_string())
            };

            if failed {
                writeln!(out)?;
                if let Some(message) = self.workspace.conversation().messages.last() {
                    if message.message_type() == MessageType::Error {
                        writeln!(out, "{}", Paint::red(&message.text))?;
                    }
                }
                self.printed = 0;
            } else if let Some(text) = text {
                write!(out, "{}", text.get(self.printed..).unwrap_or(""))?;
                self.printed = text.len();
                if finished {
                    writeln!(out)?;
                    writeln!(out, "{}", Paint::new("Use /insert to add this answer to the document.").dimmed())?;
                    self.printed = 0;
                }
            }
            out.flush()?;
        }

        self.report_status(out)?;
        return Ok(());
    }

    /// Stops the assistant, saves pending edits and waits for the saves to
    /// land.
    pub async fn shutdown<W: Write>(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Event>,
        out: &mut W,
    ) -> Result<()> {
        self.workspace.close_assistant();
        self.workspace.flush_pending();
        self.workspace.settle(rx).await?;
        self.report_status(out)?;

        return Ok(());
    }
}

pub async fn start(mut repl: Repl, rx: &mut mpsc::UnboundedReceiver<Event>) -> Result<()> {
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    writeln!(stdout, "Type text to append it to the open document, or /help for commands.")?;

    #[cfg(feature = "dev")]
    {
        if repl.workspace().store().active().is_none() {
            repl.handle_line("/new Scratch", &mut stdout).await?;
        }
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };

                match repl.handle_line(&line, &mut stdout).await {
                    Ok(true) => (),
                    Ok(false) => break,
                    Err(err) => {
                        tracing::debug!(error = ?err, line = %line, "Command failed");
                        writeln!(stdout, "{}", Paint::red(err))?;
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Some(event) => repl.handle_event(event, &mut stdout)?,
                    None => break,
                }
            }
        }
    }

    repl.shutdown(rx, &mut stdout).await?;
    return Ok(());
}
