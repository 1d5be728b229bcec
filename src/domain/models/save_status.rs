use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Saved,
    Unsaved,
    Saving,
    Error,
}

impl SaveStatus {
    /// Text shown in the status indicator.
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Saved => return "Saved",
            SaveStatus::Unsaved => return "Unsaved changes",
            SaveStatus::Saving => return "Syncing...",
            SaveStatus::Error => return "Save failed",
        }
    }
}
