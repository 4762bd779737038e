//! ycmd request bodies and GoTo response shapes.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Body of a `run_completer_command` request.
///
/// Serialized with sorted keys; `command_arguments` is omitted when empty and
/// `completer_target` when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YcmdRequest {
    pub line_num: usize,
    pub column_num: usize,
    pub filepath: String,
    pub file_contents: String,
    pub filetypes: Vec<String>,
    pub command_arguments: Vec<String>,
    pub completer_target: Option<String>,
}

impl YcmdRequest {
    pub fn new(
        line_num: usize,
        column_num: usize,
        filepath: impl Into<String>,
        file_contents: impl Into<String>,
    ) -> Self {
        Self {
            line_num,
            column_num,
            filepath: filepath.into(),
            file_contents: file_contents.into(),
            filetypes: Vec::new(),
            command_arguments: Vec::new(),
            completer_target: None,
        }
    }

    pub fn with_filetypes<I, S>(mut self, filetypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filetypes = filetypes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_command_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_completer_target(mut self, target: impl Into<String>) -> Self {
        self.completer_target = Some(target.into());
        self
    }
}

#[derive(Serialize)]
struct FileDataEntry<'a> {
    contents: &'a str,
    filetypes: &'a [String],
}

impl Serialize for YcmdRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let has_arguments = !self.command_arguments.is_empty();
        let len = 4 + usize::from(has_arguments) + usize::from(self.completer_target.is_some());

        let mut file_data = BTreeMap::new();
        file_data.insert(
            self.filepath.as_str(),
            FileDataEntry {
                contents: &self.file_contents,
                filetypes: &self.filetypes,
            },
        );

        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("column_num", &self.column_num)?;
        if has_arguments {
            map.serialize_entry("command_arguments", &self.command_arguments)?;
        }
        if let Some(target) = &self.completer_target {
            map.serialize_entry("completer_target", target)?;
        }
        map.serialize_entry("file_data", &file_data)?;
        map.serialize_entry("filepath", &self.filepath)?;
        map.serialize_entry("line_num", &self.line_num)?;
        map.end()
    }
}

/// A jump target reported by ycmd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub filepath: String,
    pub line_num: usize,
    pub column_num: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Shape of a GoTo answer.
///
/// An array root is always a list, even with one element; an object root is
/// a single location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoToResponse {
    Single(Location),
    Multiple(Vec<Location>),
}

impl GoToResponse {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(BridgeError::Decode("empty location list".to_string()));
                }
                let locations: Vec<Location> = serde_json::from_value(Value::Array(items))
                    .map_err(|e| BridgeError::Decode(format!("bad location list: {}", e)))?;
                Ok(GoToResponse::Multiple(locations))
            }
            Value::Object(_) => {
                let location: Location = serde_json::from_value(value)
                    .map_err(|e| BridgeError::Decode(format!("bad location: {}", e)))?;
                Ok(GoToResponse::Single(location))
            }
            other => Err(BridgeError::Decode(format!(
                "expected a location or a list of locations, got {}",
                other
            ))),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }
}
