mod aggregator;
mod autosave;
mod conversation;
mod document_store;
mod insertion;
mod workspace;

pub use aggregator::*;
pub use autosave::*;
pub use conversation::*;
pub use document_store::*;
pub use insertion::*;
pub use workspace::*;
