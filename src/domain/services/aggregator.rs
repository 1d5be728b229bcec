#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;

use std::char::REPLACEMENT_CHARACTER;
use std::str;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::domain::models::Event;
use crate::domain::models::PendingAssistantMessage;
use crate::domain::models::TextSource;

/// Incremental UTF-8 decoder. A multi-byte sequence cut by a chunk boundary
/// is held back until the rest of it arrives. Invalid bytes decode to U+FFFD.
#[derive(Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));

                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        return out;
    }

    /// Ends the stream. A sequence still incomplete at this point is invalid.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return "".to_string();
        }

        self.pending.clear();
        return REPLACEMENT_CHARACTER.to_string();
    }
}

/// Folds a generation response into a pending assistant message.
pub struct StreamAggregator {
    decoder: Utf8Decoder,
    message: PendingAssistantMessage,
}

impl Default for StreamAggregator {
    fn default() -> StreamAggregator {
        return StreamAggregator {
            decoder: Utf8Decoder::default(),
            message: PendingAssistantMessage::open(),
        };
    }
}

impl StreamAggregator {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> &PendingAssistantMessage {
        let text = self.decoder.decode(chunk);
        self.message.append(&text);
        return &self.message;
    }

    pub fn finish(&mut self) -> &PendingAssistantMessage {
        let text = self.decoder.finish();
        self.message.append(&text);
        self.message.finish();
        return &self.message;
    }

    /// Reads `source` to the end, publishing the accumulated text after every
    /// chunk. Publishing never waits on the receiver.
    ///
    /// A read failure publishes `AssistantFailed` and stops; the partial text
    /// is not reported as finished.
    pub async fn run(
        mut self,
        mut source: TextSource,
        stream: u64,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        while let Some(chunk) = source.next().await {
            match chunk {
                Ok(bytes) => {
                    let message = self.push_chunk(&bytes).clone();
                    tx.send(Event::AssistantProgress { stream, message })?;
                }
                Err(error) => {
                    tracing::error!(error = %error, stream, "Assistant stream failed");
                    tx.send(Event::AssistantFailed { stream, error })?;
                    return Ok(());
                }
            }
        }

        let message = self.finish().clone();
        tracing::debug!(stream, length = message.accumulated_text.len(), "Assistant stream finished");
        tx.send(Event::AssistantFinished { stream, message })?;

        return Ok(());
    }
}
