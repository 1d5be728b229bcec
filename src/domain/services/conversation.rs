#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;

use crate::domain::models::AssistantPrompt;
use crate::domain::models::Author;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::PendingAssistantMessage;
use crate::domain::models::SyncError;

pub const GREETING: &str = "Hi! I'm your AI writing assistant. I can help you draft content, brainstorm ideas, or analyze images. How can I help you today?";
pub const STREAM_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Message history of the assistant channel plus the one message that may be
/// streaming at any time.
pub struct Conversation {
    pub messages: Vec<Message>,
    pending: Option<PendingAssistantMessage>,
    stream: u64,
}

impl Default for Conversation {
    fn default() -> Conversation {
        return Conversation {
            messages: vec![Message::new(Author::Assistant, GREETING)],
            pending: None,
            stream: 0,
        };
    }
}

impl Conversation {
    /// True while a stream is open. New prompts are refused meanwhile.
    pub fn is_busy(&self) -> bool {
        return self
            .pending
            .as_ref()
            .map(|pending| return pending.is_open)
            .unwrap_or(false);
    }

    pub fn pending(&self) -> Option<&PendingAssistantMessage> {
        return self.pending.as_ref();
    }

    pub fn current_stream(&self) -> u64 {
        return self.stream;
    }

    /// Records the user message and opens a pending assistant message.
    /// Returns the id tagging every event of the new stream.
    pub fn begin(&mut self, prompt: &AssistantPrompt) -> Result<u64> {
        if self.is_busy() {
            bail!("The assistant is still answering the previous prompt");
        }
        if prompt.is_empty() {
            bail!("Write a prompt or attach an image first");
        }

        let image = prompt.image.as_ref().map(|image| return image.file_name.to_string());
        self.messages
            .push(Message::new(Author::User, &prompt.text).with_image(image));

        self.stream += 1;
        self.pending = Some(PendingAssistantMessage::open());

        return Ok(self.stream);
    }

    fn is_current(&self, stream: u64) -> bool {
        if stream != self.stream || !self.is_busy() {
            tracing::debug!(stream, current = self.stream, "Dropping event from a closed stream");
            return false;
        }

        return true;
    }

    pub fn handle_progress(&mut self, stream: u64, message: PendingAssistantMessage) {
        if !self.is_current(stream) {
            return;
        }

        self.pending = Some(message);
    }

    pub fn handle_finished(&mut self, stream: u64, message: PendingAssistantMessage) {
        if !self.is_current(stream) {
            return;
        }

        self.messages
            .push(Message::new(Author::Assistant, &message.accumulated_text));
        self.pending = None;
    }

    /// The partial text is discarded, an error message takes its place.
    pub fn handle_failed(&mut self, stream: u64, error: &SyncError) {
        if !self.is_current(stream) {
            return;
        }

        tracing::warn!(error = %error, stream, "Discarding partial assistant message");
        self.pending = None;
        self.messages.push(Message::new_with_type(
            Author::Assistant,
            MessageType::Error,
            STREAM_ERROR_TEXT,
        ));
    }

    /// Abandons the open stream, if any. Events still in flight for it are
    /// ignored from here on.
    pub fn close(&mut self) -> bool {
        if !self.is_busy() {
            return false;
        }

        self.pending = None;
        self.stream += 1;
        return true;
    }

    /// Latest finalized assistant answer. The greeting never counts.
    pub fn last_insertable(&self) -> Option<&Message> {
        return self
            .messages
            .iter()
            .skip(1)
            .rev()
            .find(|message| return message.is_insertable());
    }
}
