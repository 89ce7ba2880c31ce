use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::args::FormatArgs;
use crate::config::{Config, is_quiet};
use crate::model::iso_from_ms;
use crate::output::{self, OutputFormat};
use crate::store::Store;

#[derive(Args)]
pub struct DatesArgs {
    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Serialize)]
struct DateInfo {
    date: String,
    open: usize,
    done: usize,
    updated_at: String,
    #[serde(skip)]
    updated_ms: i64,
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "OPEN")]
    open: String,
    #[tabled(rename = "DONE")]
    done: String,
    #[tabled(rename = "MOD")]
    modified: String,
}

pub fn run(args: DatesArgs, store: &Store, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();
    let docs = store
        .list_dates(config.display.dates_limit)
        .map_err(|e| format!("listing dates: {}", e))?;

    let mut results = Vec::with_capacity(docs.len());
    for doc in docs {
        let todos = store
            .todos_for_date(&doc.date, false)
            .map_err(|e| format!("loading todos for {}: {}", doc.date, e))?;
        let done = todos.iter().filter(|t| t.status.is_done()).count();
        results.push(DateInfo {
            date: doc.date,
            open: todos.len() - done,
            done,
            updated_at: iso_from_ms(doc.updated_at),
            updated_ms: doc.updated_at,
        });
    }

    match format {
        OutputFormat::Pretty => {
            println!("{} dates", results.len().to_string().bold());
            if results.is_empty() {
                if !is_quiet(config) {
                    println!();
                    println!("{}", "Hint: save a day with 'dailies save --file today.md'".dimmed());
                }
                return Ok(());
            }

            let rows: Vec<TableRow> = results
                .iter()
                .map(|d| TableRow {
                    date: d.date.clone(),
                    open: if d.open > 0 {
                        d.open.to_string().yellow().to_string()
                    } else {
                        d.open.to_string().dimmed().to_string()
                    },
                    done: d.done.to_string().green().to_string(),
                    modified: output::relative_ms(d.updated_ms),
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Plain => {
            for d in &results {
                println!("{} | {} open | {} done | {}", d.date, d.open, d.done, d.updated_at);
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(&results, format)?,
    }
    Ok(())
}
