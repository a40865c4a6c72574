use serde::{Deserialize, Serialize};

/// File name of the sidecar that declares saved searches.
pub const SAVED_SEARCHES_FILE: &str = ".saved_searches.pg2conf";

/// A sidecar file of a directory (GPX companion, saved-search config, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub file_size: u64,
}

impl MetaFile {
    pub fn new(name: impl Into<String>, file_size: u64) -> Self {
        Self {
            id: None,
            name: name.into(),
            file_size,
        }
    }

    pub fn is_saved_searches(&self) -> bool {
        self.name == SAVED_SEARCHES_FILE
    }
}
