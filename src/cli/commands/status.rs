//! status command - List repositories and their state

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::engine::{discover, Context};
use crate::repo::{LoadError, Loaded, RepoState};
use crate::ui::output;

/// One line of the status listing.
#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub name: String,
    pub path: PathBuf,
    pub branch: Option<String>,
    pub tracking: Option<String>,
    pub head: Option<String>,
    pub state: Option<RepoState>,
    /// Load diagnostic or error
    pub note: Option<String>,
    /// Whether batch operations will pick this repository
    pub operational: bool,
}

impl StatusRow {
    fn from_load(path: &Path, result: &Result<Loaded, LoadError>) -> Self {
        match result {
            Ok(loaded) => {
                let entity = &loaded.entity;
                Self {
                    name: entity.name().to_string(),
                    path: entity.path().to_path_buf(),
                    branch: entity.branch().map(|b| b.name.to_string()),
                    tracking: entity
                        .remote()
                        .and_then(|r| r.branch())
                        .map(|b| b.name.to_string()),
                    head: entity.commit().map(|c| {
                        format!("{} {}", c.oid.short(7), c.summary)
                    }),
                    state: Some(entity.state()),
                    note: loaded.diagnostic.as_ref().map(|d| d.to_string()),
                    operational: loaded.is_operational(),
                }
            }
            Err(err) => Self {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                path: path.to_path_buf(),
                branch: None,
                tracking: None,
                head: None,
                state: None,
                note: Some(err.to_string()),
                operational: false,
            },
        }
    }

    fn cells(&self) -> Vec<String> {
        let dash = || "-".to_string();
        vec![
            self.name.clone(),
            self.branch.clone().unwrap_or_else(dash),
            self.tracking.clone().unwrap_or_else(dash),
            self.state.map(|s| s.to_string()).unwrap_or_else(dash),
            self.head
                .clone()
                .or_else(|| self.note.clone())
                .unwrap_or_default(),
        ]
    }
}

/// List repositories under `dirs`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `dirs` - Directories to scan (configured directories if empty)
/// * `depth` - Discovery depth override
/// * `json` - Print JSON instead of a table
pub fn status(ctx: &Context, dirs: &[PathBuf], depth: Option<usize>, json: bool) -> Result<()> {
    let dirs = super::resolve_dirs(ctx, dirs);
    let depth = super::resolve_depth(ctx, depth)?;
    let candidates = discover::discover(&dirs, depth);
    let rows: Vec<StatusRow> = discover::load_all(&candidates, &ctx.config.load_options())
        .iter()
        .map(|(path, result)| StatusRow::from_load(path, result))
        .collect();

    if json {
        output::json(&rows)?;
        return Ok(());
    }

    let verbosity = ctx.verbosity();
    if rows.is_empty() {
        output::print("No repositories found.", verbosity);
        return Ok(());
    }

    let mut table = vec![vec![
        "NAME".to_string(),
        "BRANCH".to_string(),
        "TRACKING".to_string(),
        "STATE".to_string(),
        "HEAD".to_string(),
    ]];
    table.extend(rows.iter().map(StatusRow::cells));
    output::print(output::format_table(&table), verbosity);

    for row in rows.iter().filter(|r| r.head.is_some()) {
        if let Some(note) = &row.note {
            output::warn(format!("{}: {}", row.name, note), verbosity);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_row() {
        let path = PathBuf::from("/does/not/exist/project");
        let result = Err(LoadError::EmptyRepository { path: path.clone() });
        let row = StatusRow::from_load(&path, &result);
        assert_eq!(row.name, "project");
        assert!(!row.operational);
        assert!(row.state.is_none());
        assert!(row.note.unwrap().contains("no commit"));
    }

    #[test]
    fn cells_fill_missing_values() {
        let row = StatusRow {
            name: "api".to_string(),
            path: PathBuf::from("/work/api"),
            branch: None,
            tracking: None,
            head: None,
            state: Some(RepoState::Available),
            note: Some("HEAD is detached".to_string()),
            operational: false,
        };
        assert_eq!(
            row.cells(),
            vec!["api", "-", "-", "available", "HEAD is detached"]
        );
    }
}
