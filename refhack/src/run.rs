use std::{
    cell::RefCell,
    fmt::{self, Display},
    path::Path,
};

use crossterm::style::Stylize;
use refp::{
    api::{Project, Solution},
    mirror::{DirectoryMirror, MirrorOutcome, MirrorResult},
    patch::{self, ImportOutcome},
    project::{ProjectModel, ProjectStore},
    references::ReferenceSet,
    Consume,
};

use crate::{error::Collector, options::Config, ux, EXIT_OK, EXIT_PARTIAL_FAILURE};

/// Processes solutions one by one patching all their projects
pub struct Runner<'a, S: ProjectStore> {
    config: &'a Config,
    store: &'a S,
    known: ReferenceSet,
    solutions: u64,
    projects: u64,
    imports_added: u64,
    references_rewritten: u64,
    mirror: Option<MirrorResult>,
    errors: RefCell<Collector>,
}

impl<'a, S: ProjectStore> Runner<'a, S> {
    #[must_use]
    pub fn new(config: &'a Config, store: &'a S, known: ReferenceSet) -> Self {
        Self {
            config,
            store,
            known,
            solutions: 0,
            projects: 0,
            imports_added: 0,
            references_rewritten: 0,
            mirror: None,
            errors: RefCell::new(Collector::new()),
        }
    }

    #[must_use]
    pub fn solutions(&self) -> u64 {
        self.solutions
    }

    #[must_use]
    pub fn projects(&self) -> u64 {
        self.projects
    }

    #[must_use]
    pub fn imports_added(&self) -> u64 {
        self.imports_added
    }

    #[must_use]
    pub fn references_rewritten(&self) -> u64 {
        self.references_rewritten
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.errors.borrow().count()
    }

    /// 0 if everything processed, 1 if any solution, project or mirroring failed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let mirror_failed = self.mirror.as_ref().is_some_and(|m| !m.succeeded());
        if mirror_failed || !self.errors.borrow().is_empty() {
            EXIT_PARTIAL_FAILURE
        } else {
            EXIT_OK
        }
    }

    fn mirror(&mut self, mirror: &dyn DirectoryMirror) {
        let result = mirror.mirror(
            &self.config.source,
            &self.config.dest,
            &self.config.mirror_options,
        );
        ux::print_mirror(self.config.source.display(), &result);
        if !result.succeeded() {
            let reason = match &result.outcome {
                MirrorOutcome::Completed(c) => c.to_string(),
                MirrorOutcome::Orphaned => "Mirroring process has failed to exit".to_owned(),
                MirrorOutcome::NotStarted(e) => e.clone(),
            };
            tracing::error!(
                "Mirroring {} into {} failed: {reason}",
                self.config.source.display(),
                result.destination.display()
            );
            self.errors
                .borrow_mut()
                .add(&self.config.source.to_string_lossy(), reason);
        }
        self.mirror = Some(result);
    }

    fn process_project(&mut self, solution_dir: &Path, project: &Project) {
        self.projects += 1;
        let file = project.file(solution_dir);
        let path = file.to_string_lossy();
        if self.config.verbose {
            ux::print_project(&path, project.type_description);
        }

        match patch::insert_global_import(self.store, &file, &self.config.globals) {
            Ok(ImportOutcome::Added(import)) => {
                self.imports_added += 1;
                if self.config.verbose {
                    ux::print_import_added(&import);
                }
            }
            Ok(ImportOutcome::AlreadyPresent) => {}
            Err(e) => {
                tracing::warn!("Global import wasn't added into {path}: {e}");
                self.errors.borrow_mut().add(&path, e.to_string());
            }
        }

        match patch::rewrite_references(
            self.store,
            &file,
            &self.known,
            &self.config.source,
            &self.config.variable,
        ) {
            Ok(outcome) => {
                self.references_rewritten += outcome.rewrites.len() as u64;
                if self.config.verbose {
                    outcome.rewrites.iter().for_each(ux::print_rewrite);
                }
            }
            Err(e) => {
                if self.config.verbose {
                    ux::print_error(format!("Exception: {e:?}"));
                }
                tracing::warn!("References of {path} weren't rewritten: {e}");
                self.errors.borrow_mut().add(&path, e.to_string());
            }
        }
    }
}

impl<S: ProjectStore> Consume for Runner<'_, S> {
    fn ok(&mut self, solution: &Solution) {
        self.solutions += 1;
        tracing::debug!(
            "{} parsed. Projects: {}",
            solution.path,
            solution.projects.len()
        );
        let dir = solution.dir();
        for project in solution.iterate_projects_without_web_sites() {
            self.process_project(dir, project);
        }
    }

    fn err(&self, path: &str) {
        self.errors.borrow_mut().add_path(path);
    }
}

impl<S: ProjectStore> Display for Runner<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = [
            ("Known references", self.known.len() as u64),
            ("Solutions", self.solutions),
            ("Projects", self.projects),
            ("Imports added", self.imports_added),
            ("References rewritten", self.references_rewritten),
        ]
        .map(|(name, count)| (name, count.to_string()));

        writeln!(f)?;
        writeln!(f, "{}", " Totals:".dark_yellow().bold())?;
        let table = ux::new_table(
            ["Item", "Count"],
            counts.iter().map(|(name, count)| [*name, count.as_str()]),
        );
        writeln!(f, "{table}")?;

        write!(f, "{}", self.errors.borrow())
    }
}

/// Whether globals file defines property named after variable
pub fn defines_variable<S: ProjectStore>(
    store: &S,
    globals: &Path,
    variable: &str,
) -> miette::Result<bool> {
    let project = store.load(globals)?;
    let name = crate::variable_property(variable);
    Ok(project
        .properties()
        .iter()
        .any(|p| p.name.eq_ignore_ascii_case(name)))
}

/// Runs everything configured. Failures don't stop the run but recorded
/// into the runner returned
pub fn run<'a, S: ProjectStore>(
    config: &'a Config,
    mirror: &dyn DirectoryMirror,
    store: &'a S,
) -> Runner<'a, S> {
    let known = ReferenceSet::scan(&config.source);
    tracing::debug!(
        "{} references found in {}",
        known.len(),
        config.source.display()
    );
    for file in known.files() {
        tracing::trace!("Known reference: {}", file.display());
    }

    match defines_variable(store, &config.globals, &config.variable) {
        Ok(true) => {}
        Ok(false) => tracing::warn!(
            "{} doesn't define {} property",
            config.globals.display(),
            crate::variable_property(&config.variable)
        ),
        Err(e) => tracing::warn!("Cannot read {}: {e}", config.globals.display()),
    }

    let mut runner = Runner::new(config, store, known);

    if config.mirror {
        runner.mirror(mirror);
    }

    for solution in &config.solutions {
        let path = solution.to_string_lossy();
        ux::print_solution_path(&path);
        if let Err(e) = refp::parse_file(&path, &mut runner) {
            ux::print_error(format!("{e:?}"));
            tracing::warn!("{path} skipped: {e}");
            runner
                .errors
                .borrow_mut()
                .add(&path, e.root_cause().to_string());
        }
    }

    runner
}
