use std::path::{Path, PathBuf};

use crate::{msbuild, paths};

/// Represents Visual Studio solution
#[derive(Debug, Clone, Default)]
pub struct Solution<'a> {
    /// Full path to solution file
    pub path: &'a str,
    /// Solution format
    pub format: &'a str,
    /// Solution product like Visual Studio 15 etc
    pub product: &'a str,
    /// Solution versions got from lines like `VisualStudioVersion = 17.0.31903.59`
    pub versions: Vec<Version<'a>>,
    /// Solution's projects in the order they defined in the solution file
    pub projects: Vec<Project<'a>>,
}

/// Represents [`Solution`] version. NOTE: [`Solution`] may have several versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version<'a> {
    pub name: &'a str,
    pub version: &'a str,
}

/// Represent project inside [`Solution`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Project<'a> {
    pub type_id: &'a str,
    pub type_description: &'a str,
    pub id: &'a str,
    pub name: &'a str,
    pub path_or_uri: &'a str,
}

impl<'a> Solution<'a> {
    /// Iterates all but solution folder projects inside [`Solution`]
    pub fn iterate_projects(&'a self) -> impl Iterator<Item = &'a Project<'a>> {
        self.projects
            .iter()
            .filter(|p| !msbuild::is_solution_folder(p.type_id))
    }

    /// Iterates all but solution folder and website projects.
    /// Only these projects have project file that can be changed
    pub fn iterate_projects_without_web_sites(&'a self) -> impl Iterator<Item = &'a Project<'a>> {
        self.iterate_projects()
            .filter(|p| !msbuild::is_web_site_project(p.type_id))
    }

    /// Directory that contains solution file. Project paths are relative to it
    #[must_use]
    pub fn dir(&self) -> &Path {
        crate::parent_of(self.path)
    }
}

impl<'a> Project<'a> {
    #[must_use]
    pub fn new(type_id: &'a str, name: &'a str, path_or_uri: &'a str, id: &'a str) -> Self {
        Self {
            type_id,
            type_description: msbuild::describe_project(type_id),
            id,
            name,
            path_or_uri,
        }
    }

    /// Full path to the project file. Path without extension considered
    /// as directory that contains project file named as project itself
    #[must_use]
    pub fn file(&self, solution_dir: &Path) -> PathBuf {
        let path = paths::resolve_absolute(solution_dir, self.path_or_uri);
        if path.extension().is_some() {
            path
        } else {
            path.join(self.name)
        }
    }
}
