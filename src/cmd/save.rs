use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::args::{DateArg, FormatArgs};
use crate::config::{Config, is_quiet};
use crate::input;
use crate::output::{self, OutputFormat};
use crate::reconcile::{self, SaveOutcome};
use crate::store::Store;

#[derive(Args)]
pub struct SaveArgs {
    #[command(flatten)]
    date: DateArg,

    /// Read markdown from this file instead of stdin
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Write the stored markdown (with markers) back to --file
    #[arg(long, requires = "file")]
    write: bool,

    /// Print the stored markdown to stdout (summary goes to stderr)
    #[arg(long)]
    print: bool,

    #[command(flatten)]
    format: FormatArgs,
}

pub fn run(args: SaveArgs, store: &mut Store, config: &Config) -> Result<(), String> {
    let date = args.date.resolve();
    let submitted = input::read_document(args.file.as_deref())?;

    let outcome = reconcile::save_daily(store, date, &submitted)?;
    let changed = outcome.markdown != submitted;

    if args.write
        && changed
        && let Some(path) = &args.file
    {
        input::write_document(path, &outcome.markdown)?;
    }

    if args.print {
        print!("{}", outcome.markdown);
        eprintln!("{}", summary(&outcome));
        return Ok(());
    }

    match args.format.resolve() {
        OutputFormat::Pretty => {
            println!("{}", summary(&outcome).bold());
            if changed && !args.write && !is_quiet(config) {
                println!(
                    "{}",
                    "Hint: markers were added; use --write or --print to get the stored text"
                        .dimmed()
                );
            }
        }
        OutputFormat::Plain => println!("{}", summary(&outcome)),
        format @ (OutputFormat::Json | OutputFormat::Yaml) => {
            output::print_structured(&outcome, format)?;
        }
    }
    Ok(())
}

fn summary(outcome: &SaveOutcome) -> String {
    format!(
        "Saved {}: {} todos ({} new, {} removed), {} topic entries",
        outcome.date, outcome.todos, outcome.created, outcome.soft_deleted, outcome.topic_entries
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let outcome = SaveOutcome {
            date: "2026-03-02".to_string(),
            markdown: String::new(),
            todos: 3,
            created: 1,
            soft_deleted: 2,
            topic_entries: 0,
        };
        assert_eq!(
            summary(&outcome),
            "Saved 2026-03-02: 3 todos (1 new, 2 removed), 0 topic entries"
        );
    }
}
