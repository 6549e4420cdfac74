use std::path::Path;

use serde::{Deserialize, Serialize};

/// Terminal outcome of one worker run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub table_name: String,
    pub sql_path: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportResult {
    pub fn success(table_name: &str, sql_path: &Path) -> Self {
        Self {
            table_name: table_name.to_string(),
            sql_path: sql_path.to_string_lossy().into_owned(),
            success: true,
            error: None,
        }
    }

    pub fn failure(table_name: &str, sql_path: &Path, error: impl Into<String>) -> Self {
        Self {
            table_name: table_name.to_string(),
            sql_path: sql_path.to_string_lossy().into_owned(),
            success: false,
            error: Some(error.into()),
        }
    }

    /// Process exit status matching this result.
    pub fn exit_code(&self) -> u8 {
        if self.success { 0 } else { 1 }
    }
}
