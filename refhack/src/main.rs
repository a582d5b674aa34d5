use std::io;
use std::time::Instant;

use clap::ArgMatches;
use clap_complete::{generate, Shell};
use itertools::Itertools;
use refhack::options::{self, Options};
use refhack::{run, ux, EXIT_OK, EXIT_USAGE};
use refp::mirror::Robocopy;
use refp::project::MsbuildStore;
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use mimalloc::MiMalloc;

#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    let args = options::normalize_args(std::env::args_os());
    let matches = match options::build_cli().try_get_matches_from(args) {
        Ok(m) => m,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_OK };
            std::process::exit(code);
        }
    };

    if matches.contains_id(options::COMPLETION) {
        print_completions(&matches);
        return;
    }

    let options = Options::from_matches(&matches);
    init_logging(options.verbose);

    let config = match options.validate() {
        Ok(config) => config,
        Err(errors) => {
            ux::print_error(errors.iter().join("\n"));
            std::process::exit(EXIT_USAGE);
        }
    };

    let now = Instant::now();
    let mirror = Robocopy::custom(config.mirror_tool.as_str(), vec![]);
    let runner = run::run(&config, &mirror, &MsbuildStore);

    print!("{runner}");
    ux::print_complete(now.elapsed());

    std::process::exit(runner.exit_code());
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_completions(matches: &ArgMatches) {
    let mut cmd = options::build_cli();
    let bin_name = cmd.get_name().to_string();
    if let Some(generator) = matches.get_one::<Shell>(options::COMPLETION) {
        generate(*generator, &mut cmd, bin_name, &mut io::stdout());
    }
}
