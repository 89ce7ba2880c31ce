use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::args::{DateArg, FormatArgs};
use crate::cmd::todo::TodoOutput;
use crate::model::{date_key, iso_from_ms};
use crate::output::{self, OutputFormat};
use crate::store::Store;

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    date: DateArg,

    /// Print the stored markdown verbatim (markers included)
    #[arg(long)]
    raw: bool,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Serialize)]
struct EntryOutput {
    topic: String,
    content: String,
}

#[derive(Serialize)]
struct DailyOutput {
    date: String,
    markdown: String,
    created_at: String,
    updated_at: String,
    todos: Vec<TodoOutput>,
    topic_entries: Vec<EntryOutput>,
}

pub fn run(args: ShowArgs, store: &Store) -> Result<(), String> {
    let date = date_key(args.date.resolve());
    let doc = store
        .daily(&date)
        .map_err(|e| format!("loading {}: {}", date, e))?
        .ok_or_else(|| format!("no document for {}", date))?;

    let format = args.format.resolve();
    if args.raw || format == OutputFormat::Plain {
        print!("{}", doc.markdown);
        if !doc.markdown.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    match format {
        OutputFormat::Pretty => {
            let todos = store
                .todos_for_date(&date, false)
                .map_err(|e| format!("loading todos: {}", e))?;
            let done = todos.iter().filter(|t| t.status.is_done()).count();

            println!(
                "{}  {}",
                date.cyan().bold(),
                format!(
                    "{}/{} done · updated {}",
                    done,
                    todos.len(),
                    output::relative_ms(doc.updated_at)
                )
                .dimmed()
            );
            println!();
            println!("{}", output::render_markdown(&doc.markdown));
        }
        _ => {
            let todos = store
                .todos_for_date(&date, false)
                .map_err(|e| format!("loading todos: {}", e))?;
            let entries = store
                .entries_for_date(&date)
                .map_err(|e| format!("loading topic entries: {}", e))?;

            let out = DailyOutput {
                date: doc.date.clone(),
                markdown: doc.markdown.clone(),
                created_at: iso_from_ms(doc.created_at),
                updated_at: iso_from_ms(doc.updated_at),
                todos: todos.iter().map(TodoOutput::from).collect(),
                topic_entries: entries
                    .into_iter()
                    .map(|e| EntryOutput {
                        topic: e.topic_name,
                        content: e.content_markdown,
                    })
                    .collect(),
            };
            output::print_structured(&out, format)?;
        }
    }
    Ok(())
}
