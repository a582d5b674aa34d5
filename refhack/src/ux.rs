use std::fmt::Display;
use std::time::Duration;

use comfy_table::{presets, Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use crossterm::style::{style, Color, Stylize};
use refp::mirror::{MirrorOutcome, MirrorResult};
use refp::patch::Rewrite;

#[must_use]
pub fn new_table<'a, const N: usize>(
    head: [&str; N],
    rows: impl Iterator<Item = [&'a str; N]>,
) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(head.into_iter().map(|h| {
            Cell::new(h)
                .add_attribute(Attribute::Bold)
                .fg(TableColor::DarkGrey)
        }));

    for row in rows {
        table.add_row(row);
    }
    table
}

pub fn print_solution_path(path: &str) {
    let path = style(path)
        .with(Color::Rgb {
            r: 0xAA,
            g: 0xAA,
            b: 0xAA,
        })
        .bold();
    println!("Operating on VS Solution: {path}");
}

pub fn print_project(path: impl Display, kind: &str) {
    println!(
        "{}",
        format!("Operating on project: {path} - Type: {kind}").on_blue()
    );
}

pub fn print_import_added(import: &str) {
    println!("\t{} {import}", "Added global import:".dark_green());
}

pub fn print_rewrite(rewrite: &Rewrite) {
    println!("Found Reference: {}", rewrite.include.as_str().bold());
    println!("\t\tExpanded Reference: {}", rewrite.expanded);
    println!(
        "\t\tInserted Global Property Variable: {}",
        rewrite.substituted.as_str().green()
    );
}

pub fn print_mirror(source: impl Display, result: &MirrorResult) {
    match &result.outcome {
        MirrorOutcome::Completed(c) if result.succeeded() => {
            println!("MirrorDirectory: {}", c.to_string().green());
        }
        MirrorOutcome::Completed(c) => {
            println!("MirrorDirectory: {}", c.to_string().red().bold());
        }
        MirrorOutcome::Orphaned => {
            println!(
                "{}",
                format!(
                    "Mirroring process has failed to exit, SOURCE: {source} - Dest {}",
                    result.destination.display()
                )
                .red()
            );
        }
        MirrorOutcome::NotStarted(e) => {
            println!("{} {e}", "Mirroring tool cannot be started:".red());
        }
    }
}

/// Prints error to stderr
pub fn print_error(message: impl Display) {
    eprintln!("{}", message.to_string().white().on_red());
}

pub fn print_complete(elapsed: Duration) {
    let elapsed = Duration::from_millis(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    println!(
        "Run complete... {:>2} {}",
        "elapsed:",
        humantime::format_duration(elapsed)
    );
}
