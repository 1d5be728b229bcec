#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Author;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Normal,
    Error,
}

/// One entry of the assistant conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: Author,
    pub text: String,
    /// File name of an image sent alongside a user prompt.
    pub image: Option<String>,
    mtype: MessageType,
}

impl Message {
    pub fn new(author: Author, text: &str) -> Message {
        return Message {
            author,
            text: text.to_string(),
            image: None,
            mtype: MessageType::Normal,
        };
    }

    pub fn new_with_type(author: Author, mtype: MessageType, text: &str) -> Message {
        return Message {
            author,
            text: text.to_string(),
            image: None,
            mtype,
        };
    }

    pub fn with_image(mut self, image: Option<String>) -> Message {
        self.image = image;
        return self;
    }

    pub fn message_type(&self) -> MessageType {
        return self.mtype;
    }

    /// Finalized assistant output that may be handed to the document.
    pub fn is_insertable(&self) -> bool {
        return self.author == Author::Assistant
            && self.mtype == MessageType::Normal
            && !self.text.trim().is_empty();
    }
}
