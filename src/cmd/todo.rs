use std::ffi::OsStr;

use clap::{Args, Subcommand};
use clap_complete::engine::{ArgValueCompleter, CompletionCandidate};
use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::args::FormatArgs;
use crate::config::{self, Config, is_quiet};
use crate::input;
use crate::model::{Todo, TodoStatus, iso_from_ms};
use crate::output::{self, OutputFormat};
use crate::reconcile;
use crate::store::Store;

#[derive(Args)]
pub struct TodoArgs {
    #[command(subcommand)]
    command: TodoCommand,
}

#[derive(Subcommand)]
enum TodoCommand {
    /// List todos across all dates
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one todo with its notes
    Show(ShowArgs),

    /// Mark a todo done (updates its checkbox)
    #[command(alias = "done")]
    Check(RefArgs),

    /// Mark a todo open (updates its checkbox)
    Uncheck(RefArgs),

    /// Print or replace a todo's notes (TEXT or stdin sets them)
    Notes(NotesArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Only todos with this status
    #[arg(short = 's', long, value_enum)]
    status: Option<TodoStatus>,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct RefArgs {
    /// Todo id or unique id prefix
    #[arg(add = ArgValueCompleter::new(complete_todo_ids))]
    id: String,
}

#[derive(Args)]
struct ShowArgs {
    /// Todo id or unique id prefix
    #[arg(add = ArgValueCompleter::new(complete_todo_ids))]
    id: String,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct NotesArgs {
    /// Todo id or unique id prefix
    #[arg(add = ArgValueCompleter::new(complete_todo_ids))]
    id: String,

    /// New notes (markdown)
    text: Option<String>,
}

/// Structured todo for JSON/YAML output.
#[derive(Serialize)]
pub struct TodoOutput {
    pub id: String,
    pub date: String,
    pub title: String,
    pub status: TodoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&Todo> for TodoOutput {
    fn from(todo: &Todo) -> Self {
        TodoOutput {
            id: todo.id.clone(),
            date: todo.daily_date.clone(),
            title: todo.title.clone(),
            status: todo.status,
            topic: todo.topic_name.clone(),
            created_at: iso_from_ms(todo.created_at),
            updated_at: iso_from_ms(todo.updated_at),
            notes: None,
        }
    }
}

pub fn run(args: TodoArgs, store: &mut Store, config: &Config) -> Result<(), String> {
    match args.command {
        TodoCommand::List(list_args) => run_list(list_args, store, config),
        TodoCommand::Show(show_args) => run_show(show_args, store),
        TodoCommand::Check(ref_args) => run_set_status(&ref_args.id, TodoStatus::Done, store),
        TodoCommand::Uncheck(ref_args) => run_set_status(&ref_args.id, TodoStatus::Open, store),
        TodoCommand::Notes(notes_args) => run_notes(notes_args, store, config),
    }
}

/// Resolve a full id or unique prefix to a live todo id.
pub fn resolve_ref(store: &Store, reference: &str) -> Result<String, String> {
    let reference = reference.trim().to_lowercase();
    if reference.is_empty() {
        return Err("empty todo id".to_string());
    }

    let mut matches = store
        .todo_ids_with_prefix(&reference)
        .map_err(|e| format!("looking up todo {}: {}", reference, e))?;

    if matches.iter().any(|id| *id == reference) {
        return Ok(reference);
    }
    match matches.len() {
        0 => Err(format!("todo not found: {}", reference)),
        1 => Ok(matches.remove(0)),
        n => Err(format!("ambiguous id '{}' matches {} todos", reference, n)),
    }
}

fn load(store: &Store, reference: &str) -> Result<Todo, String> {
    let id = resolve_ref(store, reference)?;
    store
        .todo(&id, false)
        .map_err(|e| format!("loading todo {}: {}", id, e))?
        .ok_or_else(|| format!("todo not found: {}", id))
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = " ")]
    status: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "TOPIC")]
    topic: String,
    #[tabled(rename = "MOD")]
    modified: String,
    #[tabled(rename = "TITLE")]
    title: String,
}

fn run_list(args: ListArgs, store: &Store, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();
    let todos = store
        .list_todos(args.status, config.display.list_limit)
        .map_err(|e| format!("listing todos: {}", e))?;

    match format {
        OutputFormat::Pretty => {
            let filter = args.status.map(|s| s.to_string()).unwrap_or_else(|| "all".to_string());
            println!("{} todos ({})", todos.len().to_string().bold(), filter.dimmed());
            if todos.is_empty() {
                if !is_quiet(config) {
                    println!();
                    println!("{}", "Hint: todos come from '- [ ]' lines saved with 'dailies save'".dimmed());
                }
                return Ok(());
            }

            let title_max = output::terminal_width().saturating_sub(50).max(20);
            let rows: Vec<TableRow> = todos
                .iter()
                .map(|t| TableRow {
                    id: output::style_id(output::short_id(&t.id)).to_string(),
                    status: output::style_status(t.status).to_string(),
                    date: t.daily_date.clone(),
                    topic: t
                        .topic_name
                        .as_deref()
                        .map(|n| output::style_topic(&output::truncate_back(n, 16)).to_string())
                        .unwrap_or_default(),
                    modified: output::relative_ms(t.updated_at),
                    title: output::truncate_back(&t.title, title_max),
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Plain => {
            for t in &todos {
                println!(
                    "{} | {} | {} | {} | {}",
                    t.id,
                    t.status,
                    t.daily_date,
                    t.topic_name.as_deref().unwrap_or("-"),
                    t.title
                );
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let out: Vec<TodoOutput> = todos.iter().map(TodoOutput::from).collect();
            output::print_structured(&out, format)?;
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, store: &Store) -> Result<(), String> {
    let format = args.format.resolve();
    let todo = load(store, &args.id)?;
    let notes = store
        .todo_notes(&todo.id)
        .map_err(|e| format!("loading notes: {}", e))?
        .map(|n| n.markdown)
        .unwrap_or_default();

    match format {
        OutputFormat::Pretty => {
            println!("{} {}", output::style_status(todo.status), todo.title.bold());
            let mut meta = vec![todo.daily_date.clone()];
            if let Some(topic) = &todo.topic_name {
                meta.push(format!("### {}", topic));
            }
            meta.push(format!("updated {}", output::relative_ms(todo.updated_at)));
            println!("{}", meta.join(" · ").dimmed());
            println!("{}", output::style_id(&todo.id));
            if !notes.trim().is_empty() {
                println!();
                println!("{}", output::render_markdown(&notes));
            }
        }
        OutputFormat::Plain => {
            println!("id: {}", todo.id);
            println!("date: {}", todo.daily_date);
            println!("status: {}", todo.status);
            println!("title: {}", todo.title);
            println!("topic: {}", todo.topic_name.as_deref().unwrap_or("-"));
            if !notes.is_empty() {
                println!();
                println!("{}", notes);
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let mut out = TodoOutput::from(&todo);
            out.notes = Some(notes);
            output::print_structured(&out, format)?;
        }
    }
    Ok(())
}

fn run_set_status(reference: &str, status: TodoStatus, store: &mut Store) -> Result<(), String> {
    let id = resolve_ref(store, reference)?;
    let todo = reconcile::set_todo_status(store, &id, status)?;

    let verb = if status.is_done() { "Checked" } else { "Unchecked" };
    println!(
        "{} {} {} ({})",
        verb,
        output::style_id(output::short_id(&todo.id)),
        todo.title,
        todo.daily_date
    );
    Ok(())
}

fn run_notes(args: NotesArgs, store: &Store, config: &Config) -> Result<(), String> {
    let id = resolve_ref(store, &args.id)?;

    let text = match args.text {
        Some(text) => Some(text),
        None => Some(input::read_stdin(false)).filter(|s| !s.is_empty()),
    };

    match text {
        Some(text) => {
            let found = store
                .set_todo_notes(&id, &text)
                .map_err(|e| format!("saving notes for {}: {}", id, e))?;
            if !found {
                return Err(format!("todo not found: {}", id));
            }
            if !is_quiet(config) {
                println!("Saved notes for {}", output::style_id(output::short_id(&id)));
            }
        }
        None => {
            let notes = store
                .todo_notes(&id)
                .map_err(|e| format!("loading notes: {}", e))?
                .map(|n| n.markdown)
                .unwrap_or_default();
            print!("{}", notes);
            if !notes.is_empty() && !notes.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

/// Dynamic completion for todo ids (open todos, titles as help).
pub fn complete_todo_ids(current: &OsStr) -> Vec<CompletionCandidate> {
    let prefix = current.to_string_lossy().to_lowercase();
    let Ok(cwd) = std::env::current_dir() else {
        return vec![];
    };
    let loaded = config::load_config(&cwd);
    let Ok(path) = config::resolve_db_path(&loaded.config) else {
        return vec![];
    };
    if !path.exists() {
        return vec![];
    }
    let Ok(store) = Store::open(&path, config::busy_timeout(&loaded.config)) else {
        return vec![];
    };

    store
        .list_todos(Some(TodoStatus::Open), loaded.config.display.list_limit)
        .unwrap_or_default()
        .into_iter()
        .filter(|t| t.id.starts_with(&prefix))
        .map(|t| CompletionCandidate::new(t.id).help(Some(t.title.into())))
        .collect()
}
