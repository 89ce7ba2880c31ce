//! Configuration introspection command.
//!
//! Provides `dailies config` subcommands:
//! - show: Display resolved configuration
//! - env: List environment variables
//! - schema: Output JSON schema
//! - init: Create template manifest

use std::fs;
use std::path::Path;

use clap::{Args, Subcommand};

use crate::config::{
    self, CONFIG_DIR, ENV_VARS, LoadedConfig, MANIFEST_FILE, template_manifest, user_config_path,
};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show resolved configuration
    Show(ShowArgs),

    /// List environment variables
    Env,

    /// Output JSON schema for manifest validation
    Schema,

    /// Create template manifest file
    Init(InitArgs),
}

#[derive(Args)]
struct ShowArgs {
    /// Show contributing sources and the resolved database path
    #[arg(long)]
    effective: bool,
}

#[derive(Args)]
struct InitArgs {
    /// Directory to create manifest in (default: current directory)
    #[arg(default_value = ".")]
    path: String,

    /// Overwrite existing manifest
    #[arg(long)]
    force: bool,
}

pub fn run(args: ConfigArgs, loaded: &LoadedConfig, cwd: &Path) -> Result<(), String> {
    match args.command {
        ConfigCommand::Show(show_args) => run_show(loaded, show_args.effective),
        ConfigCommand::Env => run_env(),
        ConfigCommand::Schema => run_schema(),
        ConfigCommand::Init(init_args) => run_init(cwd, init_args),
    }
}

fn run_show(loaded: &LoadedConfig, effective: bool) -> Result<(), String> {
    let yaml = serde_yaml::to_string(&loaded.config)
        .map_err(|e| format!("failed to serialize config: {}", e))?;

    if effective {
        println!("# Resolved configuration");
        println!("# Sources (in order of precedence):");
        for source in &loaded.sources {
            println!("#   - {}", source);
        }
        match config::resolve_db_path(&loaded.config) {
            Ok(path) => println!("# Database: {}", path.display()),
            Err(e) => println!("# Database: unresolved ({})", e),
        }
        println!("# Quiet: {}", config::is_quiet(&loaded.config));
        println!();
        print!("{}", yaml);
    } else {
        println!("{}", yaml.trim());
    }

    Ok(())
}

fn run_env() -> Result<(), String> {
    let width = ENV_VARS.iter().map(|v| v.name.len()).max().unwrap_or(0);

    for var in ENV_VARS {
        let set = config::env_string(var.name)
            .map(|v| format!(" (set: {})", v))
            .unwrap_or_default();
        println!("{:width$}  {}{}", var.name, var.description, set, width = width);

        let mut details = vec![format!("default {}", var.default)];
        if let Some(values) = var.values {
            details.push(format!("values {}", values));
        }
        if var.config_path != "-" {
            details.push(format!("config {}", var.config_path));
        }
        println!("{:width$}  {}", "", details.join("; "), width = width);
    }

    Ok(())
}

fn run_schema() -> Result<(), String> {
    println!("{}", config::json_schema());
    Ok(())
}

fn run_init(cwd: &Path, args: InitArgs) -> Result<(), String> {
    let target_dir = cwd.join(&args.path);
    let config_dir = target_dir.join(CONFIG_DIR);
    let manifest_path = config_dir.join(MANIFEST_FILE);

    if manifest_path.exists() && !args.force {
        return Err(format!(
            "manifest already exists: {}\nUse --force to overwrite",
            manifest_path.display()
        ));
    }

    fs::create_dir_all(&config_dir)
        .map_err(|e| format!("failed to create {}: {}", config_dir.display(), e))?;
    fs::write(&manifest_path, template_manifest())
        .map_err(|e| format!("failed to write {}: {}", manifest_path.display(), e))?;

    println!("Created: {}", manifest_path.display());

    if let Some(user_path) = user_config_path()
        && !user_path.exists()
    {
        println!(
            "Hint: User global config can be placed at: {}",
            user_path.display()
        );
    }

    Ok(())
}
