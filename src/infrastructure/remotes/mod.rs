pub mod http;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;

use crate::domain::models::RemoteBox;
use crate::domain::models::RemoteName;

pub struct RemoteManager {}

impl RemoteManager {
    pub fn get(name: RemoteName) -> Result<RemoteBox> {
        match name {
            RemoteName::Http => return Ok(Arc::<http::HttpRemote>::default()),
            RemoteName::Memory => return Ok(Arc::<memory::MemoryRemote>::default()),
        }
    }
}
