#![warn(unused_extern_crates)]
#![allow(clippy::missing_errors_doc)]
pub mod error;
pub mod options;
pub mod run;
pub mod ux;

/// Everything processed successfully
pub const EXIT_OK: i32 = exitcode::OK;
/// Some solutions, projects or mirroring failed
pub const EXIT_PARTIAL_FAILURE: i32 = 1;
/// Bad command line or validation failure. Nothing was changed
pub const EXIT_USAGE: i32 = 2;

/// Default variable to substitute external references directory with
pub const DEFAULT_VARIABLE: &str = "$(THIRD_PARTY_REFPATH)";

/// Makes `$(NAME)` from bare `NAME`. Already wrapped names returned as is
#[must_use]
pub fn to_variable(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("$(") && name.ends_with(')') {
        name.to_owned()
    } else {
        format!("$({name})")
    }
}

/// Property name from variable i.e. `NAME` from `$(NAME)`
#[must_use]
pub fn variable_property(variable: &str) -> &str {
    variable
        .strip_prefix("$(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(variable)
}
