use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{arg, command, crate_authors, crate_description, crate_name, crate_version};
use clap::{value_parser, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use refp::mirror::{MirrorOptions, ROBOCOPY};
use refp::paths;
use thiserror::Error;

use crate::DEFAULT_VARIABLE;

const SOURCE: &str = "source";
const DEST: &str = "dest";
const GLOBALS: &str = "globals";
const SOLUTION: &str = "vsolution";
const MIRROR: &str = "mirror";
const VERBOSE: &str = "verbose";
const VARIABLE: &str = "variable";
const RETRIES: &str = "retries";
const MIRROR_LOG: &str = "mirror-log";
const MIRROR_TIMEOUT: &str = "mirror-timeout";
const MIRROR_TOOL: &str = "mirror-tool";
pub const COMPLETION: &str = "completion";

const DEFAULT_RETRIES_ARG: &str = "4";
const DEFAULT_TIMEOUT_ARG: &str = "1h";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Error - missing source directory argument")]
    MissingSource,
    #[error("Error - missing dest directory argument")]
    MissingDest,
    #[error("Error - missing globals file argument")]
    MissingGlobals,
    #[error("Error - {0} (source) directory not found")]
    SourceNotFound(String),
    #[error("Error - {0} (dest) directory not found")]
    DestNotFound(String),
    #[error("Error - {0} (globals) file not found")]
    GlobalsNotFound(String),
    #[error("Error - (vsolution) missing argument(s)")]
    MissingSolution,
    #[error("Error - {0} (solution) file not found")]
    SolutionNotFound(String),
}

/// Command line options as they were passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub source: Option<String>,
    pub dest: Option<String>,
    pub globals: Option<String>,
    pub solutions: Vec<String>,
    pub mirror: bool,
    pub verbose: bool,
    pub variable: String,
    pub retries: u32,
    pub mirror_log: Option<String>,
    pub mirror_timeout: Duration,
    pub mirror_tool: String,
}

/// Validated options. All paths are absolute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub globals: PathBuf,
    pub solutions: Vec<PathBuf>,
    pub mirror: bool,
    pub verbose: bool,
    pub variable: String,
    pub mirror_options: MirrorOptions,
    pub mirror_tool: String,
}

impl Default for Options {
    fn default() -> Self {
        let mirror = MirrorOptions::default();
        Self {
            source: None,
            dest: None,
            globals: None,
            solutions: vec![],
            mirror: false,
            verbose: false,
            variable: DEFAULT_VARIABLE.to_owned(),
            retries: mirror.retries,
            mirror_log: None,
            mirror_timeout: mirror.timeout,
            mirror_tool: ROBOCOPY.to_owned(),
        }
    }
}

impl Options {
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let defaults = Self::default();
        Self {
            source: matches.get_one::<String>(SOURCE).cloned(),
            dest: matches.get_one::<String>(DEST).cloned(),
            globals: matches.get_one::<String>(GLOBALS).cloned(),
            solutions: matches
                .get_many::<String>(SOLUTION)
                .map(|v| v.cloned().collect())
                .unwrap_or_default(),
            mirror: matches.get_flag(MIRROR),
            verbose: matches.get_flag(VERBOSE),
            variable: matches
                .get_one::<String>(VARIABLE)
                .map_or(defaults.variable, |v| crate::to_variable(v)),
            retries: matches
                .get_one::<u32>(RETRIES)
                .copied()
                .unwrap_or(defaults.retries),
            mirror_log: matches.get_one::<String>(MIRROR_LOG).cloned(),
            mirror_timeout: matches
                .get_one::<humantime::Duration>(MIRROR_TIMEOUT)
                .map_or(defaults.mirror_timeout, |d| (*d).into()),
            mirror_tool: matches
                .get_one::<String>(MIRROR_TOOL)
                .cloned()
                .unwrap_or(defaults.mirror_tool),
        }
    }

    /// Checks all options and returns either validated config or all problems found
    pub fn validate(&self) -> Result<Config, Vec<ValidationError>> {
        let mut errors = vec![];

        let source = existing(
            self.source.as_deref(),
            Path::is_dir,
            ValidationError::MissingSource,
            ValidationError::SourceNotFound,
            &mut errors,
        );
        let dest = existing(
            self.dest.as_deref(),
            Path::is_dir,
            ValidationError::MissingDest,
            ValidationError::DestNotFound,
            &mut errors,
        );
        let globals = existing(
            self.globals.as_deref(),
            Path::is_file,
            ValidationError::MissingGlobals,
            ValidationError::GlobalsNotFound,
            &mut errors,
        );

        if self.solutions.is_empty() {
            errors.push(ValidationError::MissingSolution);
        }
        let solutions: Vec<PathBuf> = self
            .solutions
            .iter()
            .filter_map(|s| {
                existing(
                    Some(s.as_str()),
                    Path::is_file,
                    ValidationError::MissingSolution,
                    ValidationError::SolutionNotFound,
                    &mut errors,
                )
            })
            .collect();

        match (source, dest, globals) {
            (Some(source), Some(dest), Some(globals)) if errors.is_empty() => Ok(Config {
                source,
                dest,
                globals,
                solutions,
                mirror: self.mirror,
                verbose: self.verbose,
                variable: self.variable.clone(),
                mirror_options: MirrorOptions {
                    retries: self.retries,
                    log_dir: self.mirror_log.as_ref().map(|d| paths::absolute(Path::new(d))),
                    timeout: self.mirror_timeout,
                },
                mirror_tool: self.mirror_tool.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Checks that path is given and exists. Returns absolute path if so
fn existing(
    path: Option<&str>,
    exists: fn(&Path) -> bool,
    missing: ValidationError,
    not_found: fn(String) -> ValidationError,
    errors: &mut Vec<ValidationError>,
) -> Option<PathBuf> {
    let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
        errors.push(missing);
        return None;
    };
    if exists(Path::new(path)) {
        Some(paths::absolute(Path::new(path)))
    } else {
        errors.push(not_found(path.to_owned()));
        None
    }
}

#[cfg(target_os = "windows")]
const SOLUTION_SHORTS: [&str; 2] = ["-vs", "/vs"];

// `/vs` is a valid absolute path elsewhere
#[cfg(not(target_os = "windows"))]
const SOLUTION_SHORTS: [&str; 1] = ["-vs"];

/// Converts two letters short options that clap cannot handle (`-vs`, `-vs=file`
/// and `/vs:file` on Windows) into long ones
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(s) = arg.to_str() else {
                return arg;
            };
            for prefix in SOLUTION_SHORTS {
                if let Some(rest) = s.strip_prefix(prefix) {
                    if rest.is_empty() {
                        return OsString::from(format!("--{SOLUTION}"));
                    }
                    if let Some(value) = rest.strip_prefix(['=', ':']) {
                        return OsString::from(format!("--{SOLUTION}={value}"));
                    }
                }
            }
            arg
        })
        .collect()
}

#[must_use]
pub fn build_cli() -> Command {
    command!(crate_name!())
        .arg_required_else_help(true)
        .version(crate_version!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .after_help("Each project of the solutions specified will import global properties file and external references\nwill point to the files using variable defined in global properties file.")
        .arg(
            arg!(-s --source <DIR>)
                .required(false)
                .help("Directory that contains external references (dlls, tlbs, etc.) the projects point to"),
        )
        .arg(
            arg!(-r --dest <DIR>)
                .required(false)
                .help("Directory the external references directory will be mirrored into"),
        )
        .arg(
            arg!(-g --globals <FILE>)
                .required(false)
                .help("Global project properties file that defines external references variable. Each project will import it"),
        )
        .arg(
            arg!(--vsolution <FILE>)
                .visible_alias("vs")
                .required(false)
                .action(ArgAction::Append)
                .help("Visual Studio solution to operate on. Can be specified several times (also as -vs)"),
        )
        .arg(
            arg!(-m --mirror)
                .required(false)
                .action(ArgAction::SetTrue)
                .help("Mirror source directory into destination before changing projects"),
        )
        .arg(
            arg!(-v --verbose)
                .required(false)
                .action(ArgAction::SetTrue)
                .help("Run in verbose output mode"),
        )
        .arg(
            arg!(--variable <NAME>)
                .required(false)
                .default_value(DEFAULT_VARIABLE)
                .help("Build variable that replaces source directory in references paths. NAME is wrapped as $(NAME) if necessary"),
        )
        .arg(
            arg!(--retries <NUMBER>)
                .required(false)
                .value_parser(value_parser!(u32))
                .default_value(DEFAULT_RETRIES_ARG)
                .help("Number of retries on failed copies while mirroring. 0 means tool default"),
        )
        .arg(
            arg!(--"mirror-log" <DIR>)
                .required(false)
                .help("Directory to write mirroring log into"),
        )
        .arg(
            arg!(--"mirror-timeout" <DURATION>)
                .required(false)
                .value_parser(value_parser!(humantime::Duration))
                .default_value(DEFAULT_TIMEOUT_ARG)
                .help("Time to wait mirroring to complete. For example 30m or 1h 30m"),
        )
        .arg(
            arg!(--"mirror-tool" <PROGRAM>)
                .required(false)
                .default_value(ROBOCOPY)
                .help("Robocopy compatible mirroring program"),
        )
        .arg(
            arg!(--completion <SHELL>)
                .required(false)
                .value_parser(value_parser!(Shell))
                .help("Generate the autocompletion script for the specified shell"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_case::test_case;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test_case(&["refhack", "-vs", "a.sln"], &["refhack", "--vsolution", "a.sln"] ; "separate value")]
    #[test_case(&["refhack", "-vs=a.sln"], &["refhack", "--vsolution=a.sln"] ; "equal sign")]
    #[test_case(&["refhack", "-v", "-s", "dir"], &["refhack", "-v", "-s", "dir"] ; "other options untouched")]
    #[test_case(&["refhack", "-vsx"], &["refhack", "-vsx"] ; "unknown option untouched")]
    fn normalize_args_tests(args: &[&str], expected: &[&str]) {
        // Act
        let actual = normalize_args(os(args));

        // Assert
        assert_eq!(actual, os(expected));
    }

    #[cfg(target_os = "windows")]
    #[test_case(&["refhack", "/vs:a.sln"], &["refhack", "--vsolution=a.sln"] ; "windows style")]
    #[test_case(&["refhack", "/vs", "a.sln"], &["refhack", "--vsolution", "a.sln"] ; "windows style separate value")]
    fn normalize_args_windows_tests(args: &[&str], expected: &[&str]) {
        // Act
        let actual = normalize_args(os(args));

        // Assert
        assert_eq!(actual, os(expected));
    }

    #[cfg(not(target_os = "windows"))]
    #[test_case(&["refhack", "-r", "/vs"], &["refhack", "-r", "/vs"] ; "directory value")]
    #[test_case(&["refhack", "-r", "/vs:x"], &["refhack", "-r", "/vs:x"] ; "directory value with colon")]
    fn normalize_args_keeps_unix_paths(args: &[&str], expected: &[&str]) {
        // Act
        let actual = normalize_args(os(args));

        // Assert
        assert_eq!(actual, os(expected));
    }

    #[test]
    fn parse_all_options() {
        // Arrange
        let args = os(&[
            "refhack", "-s", "ext", "-r", "mirror", "-g", "global.props", "-vs", "a.sln", "-vs=b.sln",
            "-m", "-v", "--variable", "EXT", "--retries", "0", "--mirror-log", "logs",
            "--mirror-timeout", "30m", "--mirror-tool", "rsync",
        ]);

        // Act
        let matches = build_cli().try_get_matches_from(normalize_args(args)).unwrap();
        let options = Options::from_matches(&matches);

        // Assert
        assert_eq!(
            options,
            Options {
                source: Some("ext".to_owned()),
                dest: Some("mirror".to_owned()),
                globals: Some("global.props".to_owned()),
                solutions: vec!["a.sln".to_owned(), "b.sln".to_owned()],
                mirror: true,
                verbose: true,
                variable: "$(EXT)".to_owned(),
                retries: 0,
                mirror_log: Some("logs".to_owned()),
                mirror_timeout: Duration::from_secs(30 * 60),
                mirror_tool: "rsync".to_owned(),
            }
        );
    }

    #[test]
    fn parse_defaults() {
        // Arrange
        let args = os(&["refhack", "-s", "ext"]);

        // Act
        let matches = build_cli().try_get_matches_from(args).unwrap();
        let options = Options::from_matches(&matches);

        // Assert
        assert_eq!(
            options,
            Options {
                source: Some("ext".to_owned()),
                ..Default::default()
            }
        );
    }

    #[test_case(&["refhack", "--retries", "x"] ; "bad number")]
    #[test_case(&["refhack", "--mirror-timeout", "soon"] ; "bad duration")]
    #[test_case(&["refhack", "--unknown"] ; "unknown flag")]
    fn parse_errors(args: &[&str]) {
        // Act
        let result = build_cli().try_get_matches_from(os(args));

        // Assert
        assert!(result.is_err());
    }

    #[test]
    fn validate_nothing_given() {
        // Arrange
        let options = Options::default();

        // Act
        let result = options.validate();

        // Assert
        assert_eq!(
            result,
            Err(vec![
                ValidationError::MissingSource,
                ValidationError::MissingDest,
                ValidationError::MissingGlobals,
                ValidationError::MissingSolution,
            ])
        );
    }

    #[test]
    fn validate_reports_all_not_found() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let missing = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
        let options = Options {
            source: Some(missing("ext")),
            dest: Some(missing("mirror")),
            globals: Some(missing("global.props")),
            solutions: vec![missing("a.sln"), missing("b.sln")],
            ..Default::default()
        };

        // Act
        let result = options.validate();

        // Assert
        assert_eq!(
            result,
            Err(vec![
                ValidationError::SourceNotFound(missing("ext")),
                ValidationError::DestNotFound(missing("mirror")),
                ValidationError::GlobalsNotFound(missing("global.props")),
                ValidationError::SolutionNotFound(missing("a.sln")),
                ValidationError::SolutionNotFound(missing("b.sln")),
            ])
        );
    }

    #[test]
    fn validate_success() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let ext = dir.path().join("ext");
        let mirror = dir.path().join("mirror");
        fs::create_dir(&ext).unwrap();
        fs::create_dir(&mirror).unwrap();
        let globals = dir.path().join("global.props");
        let sln = dir.path().join("a.sln");
        fs::write(&globals, "<Project />").unwrap();
        fs::write(&sln, "").unwrap();
        let options = Options {
            source: Some(ext.to_string_lossy().into_owned()),
            dest: Some(mirror.to_string_lossy().into_owned()),
            globals: Some(globals.to_string_lossy().into_owned()),
            solutions: vec![sln.to_string_lossy().into_owned()],
            mirror: true,
            ..Default::default()
        };

        // Act
        let config = options.validate().unwrap();

        // Assert
        assert_eq!(config.source, ext);
        assert_eq!(config.dest, mirror);
        assert_eq!(config.globals, globals);
        assert_eq!(config.solutions, vec![sln]);
        assert!(config.mirror);
        assert_eq!(config.variable, DEFAULT_VARIABLE);
        assert_eq!(config.mirror_options, MirrorOptions::default());
    }

    #[test]
    fn validate_source_is_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();
        let file = file.to_string_lossy().into_owned();
        let options = Options {
            source: Some(file.clone()),
            dest: Some(dir.path().to_string_lossy().into_owned()),
            globals: Some(file.clone()),
            solutions: vec![file.clone()],
            ..Default::default()
        };

        // Act
        let result = options.validate();

        // Assert
        assert_eq!(result, Err(vec![ValidationError::SourceNotFound(file)]));
    }
}
