mod assistant;
mod author;
mod document;
mod editor;
mod error;
mod event;
mod message;
mod remote;
mod save_status;
mod slash_commands;

pub use assistant::*;
pub use author::*;
pub use document::*;
pub use editor::*;
pub use error::*;
pub use event::*;
pub use message::*;
pub use remote::*;
pub use save_status::*;
pub use slash_commands::*;
