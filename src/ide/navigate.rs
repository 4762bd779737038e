//! Turning a GoTo answer into editor actions.

use serde_json::Value;

use crate::acme::{Acme, AcmeWindow, WinFile};
use crate::error::{BridgeError, Result};
use crate::ycmd::{GoToResponse, Location};

/// What a completer command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Jump(Location),
    Ambiguous(Vec<Location>),
    Failed(String),
}

impl Resolution {
    pub fn from_response(response: Result<Value>) -> Self {
        match response.and_then(GoToResponse::from_value) {
            Ok(GoToResponse::Single(location)) => Resolution::Jump(location),
            Ok(GoToResponse::Multiple(locations)) => Resolution::Ambiguous(locations),
            Err(e) => Resolution::Failed(e.to_string()),
        }
    }
}

/// How a resolution will be carried out in a given window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationPlan {
    /// Hand the location to the plumber.
    Plumb(String),
    /// Replace the window's contents with the target file.
    Overwrite(Location),
    /// Write candidates to the window's errors file.
    List(String),
    Nothing(String),
}

/// Acme address selecting `location` within its file.
pub fn acme_address(location: &Location) -> String {
    format!("{}-+#{}", location.line_num, location.column_num)
}

/// `path:address`, as understood by the plumber.
pub fn plumb_string(location: &Location) -> String {
    format!("{}:{}", location.filepath, acme_address(location))
}

/// One `path:line:` entry per location, with the description pushed right
/// by `column` spaces so it lines up under the source column.
pub fn format_location_list(locations: &[Location]) -> String {
    locations
        .iter()
        .map(|location| {
            format!(
                "{}:{}:{}{}",
                location.filepath,
                location.line_num,
                " ".repeat(location.column_num),
                location.description.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decides how to apply `resolution` to a window named `window_name`.
///
/// A jump never overwrites unsaved edits and never reloads the file it is
/// already showing; both cases go through the plumber instead.
pub fn plan(resolution: Resolution, window_name: &str, window_dirty: bool) -> NavigationPlan {
    match resolution {
        Resolution::Jump(location) => {
            if window_dirty || location.filepath == window_name {
                NavigationPlan::Plumb(plumb_string(&location))
            } else {
                NavigationPlan::Overwrite(location)
            }
        }
        Resolution::Ambiguous(locations) => NavigationPlan::List(format_location_list(&locations)),
        Resolution::Failed(reason) => NavigationPlan::Nothing(reason),
    }
}

async fn best_effort<F>(step: &str, window: usize, fut: F)
where
    F: std::future::Future<Output = Result<()>>,
{
    if let Err(e) = fut.await {
        tracing::warn!("window {}: {} failed: {}", window, step, e);
    }
}

/// Loads `location`'s file into `win` and selects the target.
///
/// Only a failure to read the file stops the sequence.
pub async fn overwrite_window(win: &mut dyn AcmeWindow, location: &Location) -> Result<()> {
    let contents = tokio::fs::read(&location.filepath).await.map_err(|e| {
        BridgeError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read {}: {}", location.filepath, e),
        ))
    })?;

    let id = win.id();
    best_effort("select all", id, win.set_addr(",")).await;
    best_effort("replace body", id, win.write(WinFile::Data, &contents)).await;
    best_effort("rename", id, win.ctl(&format!("name {}", location.filepath))).await;
    best_effort("set addr", id, win.set_addr(&acme_address(location))).await;
    best_effort("select target", id, win.ctl("dot=addr")).await;
    best_effort("mark clean", id, win.ctl("clean")).await;
    best_effort("show", id, win.ctl("show")).await;
    Ok(())
}

/// Carries out `plan`. Returns the window's new name when it changed.
pub async fn apply(
    plan: NavigationPlan,
    acme: &dyn Acme,
    win: &mut dyn AcmeWindow,
) -> Result<Option<String>> {
    match plan {
        NavigationPlan::Plumb(target) => {
            tracing::info!("window {}: plumbing {}", win.id(), target);
            acme.plumb(&target).await?;
            Ok(None)
        }
        NavigationPlan::Overwrite(location) => {
            tracing::info!(
                "window {}: opening {} in place",
                win.id(),
                plumb_string(&location)
            );
            overwrite_window(win, &location).await?;
            Ok(Some(location.filepath))
        }
        NavigationPlan::List(listing) => {
            win.write_errors(&format!("{}\n", listing)).await?;
            Ok(None)
        }
        NavigationPlan::Nothing(reason) => {
            tracing::warn!("window {}: no usable result: {}", win.id(), reason);
            Ok(None)
        }
    }
}

/// Looks up the window's dirty state only when a jump needs it, then plans
/// and applies `resolution`.
pub async fn apply_resolution(
    resolution: Resolution,
    window_name: &str,
    acme: &dyn Acme,
    win: &mut dyn AcmeWindow,
) -> Result<Option<String>> {
    let dirty = match &resolution {
        Resolution::Jump(_) => match win.is_dirty().await {
            Ok(dirty) => dirty,
            Err(e) => {
                tracing::warn!("window {}: cannot read dirty flag, assuming dirty: {}", win.id(), e);
                true
            }
        },
        _ => false,
    };
    apply(plan(resolution, window_name, dirty), acme, win).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location(path: &str, line: usize, column: usize, description: Option<&str>) -> Location {
        Location {
            filepath: path.to_string(),
            line_num: line,
            column_num: column,
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn test_resolution_from_single_object() {
        let resolution = Resolution::from_response(Ok(json!({
            "line_num": 3, "column_num": 1, "filepath": "/a.py"
        })));
        assert_eq!(resolution, Resolution::Jump(location("/a.py", 3, 1, None)));
    }

    #[test]
    fn test_resolution_from_list() {
        let resolution = Resolution::from_response(Ok(json!([
            {"line_num": 3, "column_num": 1, "filepath": "/a.py", "description": "a"},
            {"line_num": 9, "column_num": 5, "filepath": "/b.py", "description": "b"}
        ])));
        match resolution {
            Resolution::Ambiguous(locations) => assert_eq!(locations.len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_from_errors() {
        let server_error = Resolution::from_response(Err(BridgeError::Server {
            status: 500,
            body: r#"{"message":"Can't jump to definition."}"#.to_string(),
        }));
        match server_error {
            Resolution::Failed(reason) => assert!(reason.contains("Can't jump to definition.")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(matches!(
            Resolution::from_response(Ok(json!("nope"))),
            Resolution::Failed(_)
        ));
    }

    #[test]
    fn test_dirty_same_file_jump_plumbs() {
        let plan = plan(Resolution::Jump(location("/a.py", 3, 1, None)), "/a.py", true);
        assert_eq!(plan, NavigationPlan::Plumb("/a.py:3-+#1".to_string()));
    }

    #[test]
    fn test_clean_same_file_jump_plumbs() {
        let plan = plan(Resolution::Jump(location("/a.py", 3, 1, None)), "/a.py", false);
        assert_eq!(plan, NavigationPlan::Plumb("/a.py:3-+#1".to_string()));
    }

    #[test]
    fn test_dirty_other_file_jump_plumbs() {
        let plan = plan(Resolution::Jump(location("/b.py", 7, 4, None)), "/a.py", true);
        assert_eq!(plan, NavigationPlan::Plumb("/b.py:7-+#4".to_string()));
    }

    #[test]
    fn test_clean_other_file_jump_overwrites() {
        let target = location("/b.py", 7, 4, None);
        let plan = plan(Resolution::Jump(target.clone()), "/a.py", false);
        assert_eq!(plan, NavigationPlan::Overwrite(target));
    }

    #[test]
    fn test_ambiguous_never_navigates() {
        let plan = plan(
            Resolution::Ambiguous(vec![location("/b.py", 7, 4, Some("def f():"))]),
            "/a.py",
            false,
        );
        assert_eq!(plan, NavigationPlan::List("/b.py:7:    def f():".to_string()));
    }

    #[test]
    fn test_format_location_list_pads_to_column() {
        let listing = format_location_list(&[
            location("/a.py", 3, 1, Some("x = 1")),
            location("/b.py", 12, 5, Some("x += 1")),
            location("/c.py", 1, 2, None),
        ]);
        assert_eq!(listing, "/a.py:3: x = 1\n/b.py:12:     x += 1\n/c.py:1:  ");
    }
}
