use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::env::CompleteEnv;
use clap_complete::{Shell, generate};

mod args;
mod cmd;
mod config;
mod index;
mod input;
mod marker;
mod model;
mod output;
mod reconcile;
mod stabilize;
mod store;
mod toggle;

use store::Store;

#[derive(Parser)]
#[command(name = "dailies")]
#[command(version = env!("DAILIES_VERSION"))]
#[command(about = "Daily markdown journals with durable todos")]
#[command(
    long_about = "dailies - one markdown document per day.\n\nTodo lines ('- [ ] ...') become tracked todos whose identity survives edits,\nreordering and retitling via hidden <!--todo:id--> markers. '### Name' headings\nstart topic entries collected across days."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a day's markdown and reconcile its todos and topics
    Save(cmd::save::SaveArgs),

    /// Show a day's markdown
    #[command(alias = "cat")]
    Show(cmd::show::ShowArgs),

    /// List saved dates
    Dates(cmd::dates::DatesArgs),

    /// Work with todos across days
    Todo(cmd::todo::TodoArgs),

    /// Browse topic entries across days
    Topic(cmd::topic::TopicArgs),

    /// Generate shell completion script
    Completion(CompletionArgs),

    /// Configuration introspection
    Config(cmd::config_cmd::ConfigArgs),
}

#[derive(clap::Args)]
struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Clone, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn main() {
    // Handle dynamic shell completions
    CompleteEnv::with_factory(Cli::command).complete();

    env_logger::Builder::from_env(env_logger::Env::default().filter_or(config::LOG_ENV, "warn"))
        .init();

    // Use try_parse to normalize exit codes: 0 for help/version, 1 for errors
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let exit_code = if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                0
            } else {
                1
            };
            process::exit(exit_code);
        }
    };

    if let Err(e) = dispatch(cli.command) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<(), String> {
    let cwd = std::env::current_dir().map_err(|e| format!("cannot get cwd: {}", e))?;
    let loaded = config::load_config(&cwd);

    // Commands that don't touch the database
    let command = match command {
        Commands::Completion(args) => {
            let shell = match args.shell {
                CompletionShell::Bash => Shell::Bash,
                CompletionShell::Zsh => Shell::Zsh,
                CompletionShell::Fish => Shell::Fish,
                CompletionShell::Powershell => Shell::PowerShell,
            };
            generate(shell, &mut Cli::command(), "dailies", &mut io::stdout());
            return Ok(());
        }
        Commands::Config(args) => return cmd::config_cmd::run(args, &loaded, &cwd),
        other => other,
    };

    let config = &loaded.config;
    let db_path = config::resolve_db_path(config)?;
    let mut store = Store::open(&db_path, config::busy_timeout(config))?;

    let result = match command {
        Commands::Save(args) => cmd::save::run(args, &mut store, config),
        Commands::Show(args) => cmd::show::run(args, &store),
        Commands::Dates(args) => cmd::dates::run(args, &store, config),
        Commands::Todo(args) => cmd::todo::run(args, &mut store, config),
        Commands::Topic(args) => cmd::topic::run(args, &store, config),
        Commands::Completion(_) | Commands::Config(_) => unreachable!(), // Handled above
    };

    // Report the command's error first; a close failure only matters on success
    let closed = store.close();
    result.and(closed)
}
