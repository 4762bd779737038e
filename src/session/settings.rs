//! ycmd options file contents.
//!
//! ycmd reads these from the file passed via `--options_file` at startup and
//! deletes the file once loaded. The only field this crate cares about is
//! `hmac_secret`; everything else is forwarded unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{BridgeError, Result};

/// Settings shipped with ycmd itself, used when no `--settings` file is given.
pub const DEFAULT_SETTINGS_JSON: &str = include_str!("../../default_settings.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YcmdSettings {
    #[serde(default)]
    pub filepath_completion_use_working_dir: i64,
    #[serde(default)]
    pub auto_trigger: i64,
    #[serde(default)]
    pub min_num_of_chars_for_completion: i64,
    #[serde(default)]
    pub min_num_identifier_candidate_chars: i64,
    #[serde(default)]
    pub semantic_triggers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub filetype_specific_completion_to_disable: BTreeMap<String, i64>,
    #[serde(default)]
    pub seed_identifiers_with_syntax: i64,
    #[serde(default)]
    pub collect_identifiers_from_comments_and_strings: i64,
    #[serde(default)]
    pub collect_identifiers_from_tags_files: i64,
    #[serde(default)]
    pub max_num_identifier_candidates: i64,
    #[serde(default)]
    pub max_num_candidates: i64,
    #[serde(default)]
    pub extra_conf_globlist: Vec<String>,
    #[serde(default)]
    pub global_ycm_extra_conf: String,
    #[serde(default)]
    pub confirm_extra_conf: i64,
    #[serde(default)]
    pub complete_in_comments: i64,
    #[serde(default)]
    pub complete_in_strings: i64,
    #[serde(default)]
    pub max_diagnostics_to_display: i64,
    #[serde(default)]
    pub filetype_whitelist: BTreeMap<String, i64>,
    #[serde(default)]
    pub filetype_blacklist: BTreeMap<String, i64>,
    #[serde(default)]
    pub auto_start_csharp_server: i64,
    #[serde(default)]
    pub auto_stop_csharp_server: i64,
    #[serde(default)]
    pub use_ultisnips_completer: i64,
    #[serde(default)]
    pub csharp_server_port: i64,

    /// Base64-encoded shared secret. Always overwritten by the session.
    #[serde(default)]
    pub hmac_secret: String,

    #[serde(default)]
    pub server_keep_logfiles: i64,
    #[serde(default)]
    pub gocode_binary_path: String,
    #[serde(default)]
    pub godef_binary_path: String,
    #[serde(default)]
    pub rust_src_path: String,
    #[serde(default)]
    pub racerd_binary_path: String,
    #[serde(default)]
    pub python_binary_path: String,

    /// Keys newer ycmd releases understand but this struct does not name.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl YcmdSettings {
    /// Parses the embedded defaults.
    pub fn defaults() -> Result<Self> {
        Self::from_json(DEFAULT_SETTINGS_JSON)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| BridgeError::Settings(format!("invalid ycmd settings: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Settings(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
