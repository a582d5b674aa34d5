/*!
A library for rewriting external assembly references of Microsoft Visual Studio projects.

It parses solution files, finds files under an external references directory,
patches `MSBuild` project files (global properties import and `HintPath` metadata)
and mirrors directories using external synchronization tool.

## Example: parsing solution from [&str]

```
use refp::parse_str;

const SOLUTION: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio Version 17
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "bench", "bench\bench.csproj", "{A61CD222-0F3B-47B6-9F7F-25D658368EEC}"
EndProject
Global
    GlobalSection(SolutionConfigurationPlatforms) = preSolution
        Debug|Any CPU = Debug|Any CPU
        Release|Any CPU = Release|Any CPU
    EndGlobalSection
EndGlobal
"#;

let result = parse_str(SOLUTION);
assert!(result.is_ok());
let solution = result.unwrap();
assert_eq!(solution.projects.len(), 1);
assert_eq!(solution.format, "12.00");
assert_eq!(solution.product, "Visual Studio Version 17");
```

## Example: inserting global import

```
use refp::patch::{insert_global_import, ImportOutcome};
use refp::project::MsbuildStore;

let dir = tempfile::tempdir().unwrap();
let project = dir.path().join("app.csproj");
std::fs::write(&project, "<Project>\n</Project>\n").unwrap();
let globals = dir.path().join("global.props");

let outcome = insert_global_import(&MsbuildStore, &project, &globals).unwrap();
assert_eq!(outcome, ImportOutcome::Added("global.props".to_owned()));

let outcome = insert_global_import(&MsbuildStore, &project, &globals).unwrap();
assert_eq!(outcome, ImportOutcome::AlreadyPresent);
```
*/

#![warn(unused_extern_crates)]
#![allow(clippy::missing_errors_doc)]
use std::fs;
use std::path::Path;

use api::Solution;
use miette::{Context, IntoDiagnostic, Result};

pub mod api;
pub mod mirror;
pub mod msbuild;
mod parser;
pub mod patch;
pub mod paths;
pub mod project;
pub mod references;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

/// Consume provides parsed [`Solution`] consumer
pub trait Consume {
    /// Called in case of success parsing
    fn ok(&mut self, solution: &Solution);
    /// Called on error
    fn err(&self, path: &str);
}

/// `parse_file` parses single solution file specified by path.
///
/// # Errors
///
/// This function will return an error if file content cannot be read into memory
/// or solution file has invalid syntax.
pub fn parse_file(path: &str, consumer: &mut dyn Consume) -> Result<()> {
    let contents = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| {
            consumer.err(path);
            format!("Failed to read content from path: {path}")
        })?;
    let mut solution = parse_str(&contents).wrap_err_with(|| {
        consumer.err(path);
        format!("Failed to parse solution from path: {path}")
    })?;

    solution.path = path;
    consumer.ok(&solution);
    Ok(())
}

/// `parse_str` parses solution content from `&str` and returns [`Solution`] in case of success
///
/// # Errors
///
/// This function will return an error if solution file has invalid syntax or corrupted.
pub fn parse_str(contents: &str) -> Result<Solution> {
    parser::parse_str(contents)
}

/// Directory containing file specified. Empty path if there is no parent
#[must_use]
pub fn parent_of(path: &str) -> &Path {
    Path::new(path).parent().unwrap_or_else(|| Path::new(""))
}

/// On Windows trailing back slash (\) to be added if volume and colon passed (like c:).
/// It needed paths look to be more pleasant
#[cfg(target_os = "windows")]
fn decorate_path(path: &str) -> String {
    if path.len() == 2 && path.ends_with(':') {
        format!("{path}\\")
    } else {
        path.to_owned()
    }
}

/// On Unix just passthrough as is
#[cfg(not(target_os = "windows"))]
fn decorate_path(path: &str) -> String {
    path.to_owned()
}
