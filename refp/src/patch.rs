//! Project file patches: global properties import and external references `HintPath` rewriting

use std::path::Path;

use crate::msbuild;
use crate::paths;
use crate::project::{ProjectModel, ProjectStore};
use crate::references::ReferenceSet;

/// Condition of the import inserted by [`insert_global_import`]
pub const GLOBAL_IMPORT_CONDITION: &str = "true";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Project already imports file with the same name
    AlreadyPresent,
    /// Import added. Contains path used as `Project` attribute
    Added(String),
}

/// Single `HintPath` change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Reference `Include` attribute
    pub include: String,
    /// `HintPath` as it was in the project
    pub original: String,
    /// `HintPath` resolved against project directory
    pub expanded: String,
    /// Value written into project
    pub substituted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub rewrites: Vec<Rewrite>,
}

/// Ensures that project imports `import_file`. Imports are compared by file name only
/// so the import already added using any path won't be duplicated.
pub fn insert_global_import<S: ProjectStore>(
    store: &S,
    project_file: &Path,
    import_file: &Path,
) -> miette::Result<ImportOutcome> {
    let mut project = store.load(project_file)?;

    let import_path = import_file.to_string_lossy();
    let import_name = paths::file_name(&import_path);
    if project
        .imports()
        .iter()
        .any(|i| paths::file_name(&i.project) == import_name)
    {
        tracing::debug!(
            "{} already imports {import_name}",
            project_file.display()
        );
        return Ok(ImportOutcome::AlreadyPresent);
    }

    let mut relative = paths::relative_path(project_file, import_file);
    if relative.is_empty() {
        relative = import_path.into_owned();
    }

    project.add_import(&relative, Some(GLOBAL_IMPORT_CONDITION))?;
    store.save(&project, project_file)?;
    tracing::debug!("Import {relative} added into {}", project_file.display());
    Ok(ImportOutcome::Added(relative))
}

/// Replaces `HintPath` of every reference that points to one of the `known` files
/// by its absolute path where `root` replaced by `variable`.
/// Project saved once after all references processed.
pub fn rewrite_references<S: ProjectStore>(
    store: &S,
    project_file: &Path,
    known: &ReferenceSet,
    root: &Path,
    variable: &str,
) -> miette::Result<RewriteOutcome> {
    let mut project = store.load(project_file)?;
    let project_dir = project_file.parent().unwrap_or_else(|| Path::new(""));
    let root = root.to_string_lossy();

    let found: Vec<(usize, Rewrite)> = project
        .references()
        .iter()
        .enumerate()
        .filter_map(|(ix, r)| {
            let hint = r.get_metadata(msbuild::HINT_PATH)?;
            if hint.is_empty() {
                return None;
            }
            let expanded = paths::resolve_clean(project_dir, hint);
            if !known.contains(&expanded) {
                return None;
            }
            let expanded = expanded.to_string_lossy().into_owned();
            let substituted = paths::substitute_root(&expanded, &root, variable);
            Some((
                ix,
                Rewrite {
                    include: r.include().to_owned(),
                    original: hint.to_owned(),
                    expanded,
                    substituted,
                },
            ))
        })
        .collect();

    let mut outcome = RewriteOutcome::default();
    for (ix, rewrite) in found {
        project.set_metadata(ix, msbuild::HINT_PATH, &rewrite.substituted)?;
        outcome.rewrites.push(rewrite);
    }

    store.save(&project, project_file)?;
    Ok(outcome)
}
