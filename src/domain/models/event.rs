use super::DocumentId;
use super::PendingAssistantMessage;
use super::SyncError;

/// Completions reported back to the workspace by timer, flush and stream
/// tasks. The workspace is the only thing that applies them to state.
#[derive(Debug)]
pub enum Event {
    AutosaveElapsed {
        generation: u64,
    },
    FlushCompleted {
        id: DocumentId,
        sequence: u64,
        result: Result<(), SyncError>,
    },
    AssistantProgress {
        stream: u64,
        message: PendingAssistantMessage,
    },
    AssistantFinished {
        stream: u64,
        message: PendingAssistantMessage,
    },
    AssistantFailed {
        stream: u64,
        error: SyncError,
    },
}
