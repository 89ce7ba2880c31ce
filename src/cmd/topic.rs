use clap::{Args, Subcommand};
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
pub struct TopicArgs {
    #[command(subcommand)]
    command: TopicCommand,
}

#[derive(Subcommand)]
enum TopicCommand {
    /// List topics that have entries
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a topic's entries, newest date first
    Show(ShowArgs),
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct ShowArgs {
    /// Topic name (the text after '### ')
    name: String,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Serialize)]
struct TopicInfo {
    name: String,
    entries: usize,
    latest: Option<String>,
}

#[derive(Serialize)]
struct EntryOutput {
    date: String,
    content: String,
    updated_at: String,
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "TOPIC")]
    name: String,
    #[tabled(rename = "ENTRIES")]
    entries: usize,
    #[tabled(rename = "LATEST")]
    latest: String,
}

pub fn run(args: TopicArgs, store: &Store, config: &Config) -> Result<(), String> {
    match args.command {
        TopicCommand::List(list_args) => run_list(list_args, store, config),
        TopicCommand::Show(show_args) => run_show(show_args, store, config),
    }
}

fn run_list(args: ListArgs, store: &Store, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();
    let names = store
        .list_topics(config.display.topics_limit)
        .map_err(|e| format!("listing topics: {}", e))?;

    let mut topics = Vec::with_capacity(names.len());
    for name in names {
        let entries = store
            .topic_entries(&name, config.display.entries_limit)
            .map_err(|e| format!("loading topic {}: {}", name, e))?;
        topics.push(TopicInfo {
            latest: entries.first().map(|e| e.daily_date.clone()),
            entries: entries.len(),
            name,
        });
    }

    match format {
        OutputFormat::Pretty => {
            println!("{} topics", topics.len().to_string().bold());
            if topics.is_empty() {
                if !is_quiet(config) {
                    println!();
                    println!("{}", "Hint: a '### Name' heading in a day starts a topic entry".dimmed());
                }
                return Ok(());
            }
            let rows: Vec<TableRow> = topics
                .iter()
                .map(|t| TableRow {
                    name: output::style_topic(&t.name).to_string(),
                    entries: t.entries,
                    latest: t.latest.clone().unwrap_or_default(),
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Plain => {
            for t in &topics {
                println!(
                    "{} | {} entries | {}",
                    t.name,
                    t.entries,
                    t.latest.as_deref().unwrap_or("-")
                );
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(&topics, format)?,
    }
    Ok(())
}

fn run_show(args: ShowArgs, store: &Store, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();
    let name = args.name.trim();
    let exists = store
        .topic_exists(name)
        .map_err(|e| format!("loading topic {}: {}", name, e))?;
    if !exists {
        return Err(format!("topic not found: {}", name));
    }

    let entries = store
        .topic_entries(name, config.display.entries_limit)
        .map_err(|e| format!("loading topic {}: {}", name, e))?;

    match format {
        OutputFormat::Pretty => {
            println!(
                "{}  {}",
                output::style_topic(name).bold(),
                format!("{} entries", entries.len()).dimmed()
            );
            for entry in &entries {
                println!();
                println!("{}", entry.daily_date.cyan().bold());
                println!("{}", output::render_markdown(&entry.content_markdown));
            }
        }
        OutputFormat::Plain => {
            for (i, entry) in entries.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("## {}", entry.daily_date);
                println!("{}", entry.content_markdown);
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let out: Vec<EntryOutput> = entries
                .into_iter()
                .map(|e| EntryOutput {
                    date: e.daily_date,
                    content: e.content_markdown,
                    updated_at: iso_from_ms(e.updated_at),
                })
                .collect();
            output::print_structured(&out, format)?;
        }
    }
    Ok(())
}
