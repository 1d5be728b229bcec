#[cfg(test)]
#[path = "assistant_test.rs"]
mod tests;

/// Image sent with a prompt as the `image` multipart field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> ImageAttachment {
        let mime_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string();

        return ImageAttachment {
            file_name: file_name.to_string(),
            mime_type,
            bytes,
        };
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantPrompt {
    pub text: String,
    pub image: Option<ImageAttachment>,
}

impl AssistantPrompt {
    pub fn new(text: &str, image: Option<ImageAttachment>) -> AssistantPrompt {
        return AssistantPrompt {
            text: text.to_string(),
            image,
        };
    }

    /// A prompt needs either text or an image.
    pub fn is_empty(&self) -> bool {
        return self.text.trim().is_empty() && self.image.is_none();
    }
}

/// The assistant message while its stream is being read. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingAssistantMessage {
    pub accumulated_text: String,
    pub is_open: bool,
}

impl PendingAssistantMessage {
    pub fn open() -> PendingAssistantMessage {
        return PendingAssistantMessage {
            accumulated_text: "".to_string(),
            is_open: true,
        };
    }

    pub fn append(&mut self, text: &str) {
        self.accumulated_text += text;
    }

    pub fn finish(&mut self) {
        self.is_open = false;
    }
}
