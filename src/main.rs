use clap::{CommandFactory, Parser};
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::{AddCommands, Commands, RemoveCommands, SkillsCommands};
use thicket::config::Config;
use thicket::manager::{ExecReport, FeatureManager};
use thicket::status::RepoStatus;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("thicket")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("thicket.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: Cli, config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let mut manager = FeatureManager::new(config);

    match cli.command {
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
        Some(Commands::Add { command }) => match command {
            AddCommands::Set { name, repos } => handle_add_set(&mut manager, &name, repos),
            AddCommands::Feature { set, feature } => {
                handle_create_feature(&mut manager, &set, &feature).await
            }
            AddCommands::Shorthand(args) => match args.as_slice() {
                [set, feature] => handle_create_feature(&mut manager, set, feature).await,
                _ => {
                    eyre::bail!("usage: thicket add <set> <feature>")
                }
            },
        },
        Some(Commands::Remove { command }) => match command {
            RemoveCommands::Set { name } => handle_remove_set(&mut manager, &name),
            RemoveCommands::Feature { name } => handle_remove_feature(&mut manager, &name).await,
            RemoveCommands::Shorthand(args) => match args.as_slice() {
                [name] => handle_remove_feature(&mut manager, name).await,
                _ => {
                    eyre::bail!("usage: thicket remove <feature>")
                }
            },
        },
        Some(Commands::List) => handle_list(&manager),
        Some(Commands::Status { feature }) => handle_status(&manager, &feature).await,
        Some(Commands::Sync { feature }) => handle_sync(&manager, &feature).await,
        Some(Commands::Exec { feature, command }) => handle_exec(&manager, &feature, command).await,
        Some(Commands::Switch { feature }) => handle_switch(&manager, &feature),
        Some(Commands::Init) => handle_init(),
        Some(Commands::Skills { command }) => match command {
            SkillsCommands::List { set } => handle_skills_list(&manager, &set),
            SkillsCommands::SetDir { set, path } => {
                handle_skills_set_dir(&mut manager, &set, &path)
            }
        },
        Some(Commands::Shortcut(args)) => handle_shortcut(&manager, args).await,
    }
}

fn handle_add_set(manager: &mut FeatureManager, name: &str, repos: Vec<String>) -> Result<()> {
    let count = repos.len();
    manager.add_set(name, repos)?;
    println!(
        "{} set '{}' with {} repo(s)",
        "Defined:".green(),
        name,
        count
    );
    Ok(())
}

async fn handle_create_feature(
    manager: &mut FeatureManager,
    set: &str,
    feature: &str,
) -> Result<()> {
    println!(
        "{} feature '{}' from set '{}'...",
        "Creating:".green(),
        feature,
        set
    );
    manager.create_feature(set, feature).await?;
    let path = manager.feature_path(feature)?;
    println!("{} {}", "Ready:".green(), path.display());
    Ok(())
}

fn handle_remove_set(manager: &mut FeatureManager, name: &str) -> Result<()> {
    manager.remove_set(name)?;
    println!("{} set '{}'", "Removed:".red(), name);
    Ok(())
}

async fn handle_remove_feature(manager: &mut FeatureManager, name: &str) -> Result<()> {
    manager.remove_feature(name).await?;
    println!("{} feature '{}'", "Removed:".red(), name);
    Ok(())
}

fn handle_list(manager: &FeatureManager) -> Result<()> {
    let config = manager.config();
    println!("{}", "Sets".bold().underline());
    if config.sets.is_empty() {
        println!("  {}", "No sets defined. Use 'thicket add set' to create one.".dimmed());
    } else {
        for (name, set) in &config.sets {
            println!(
                "  {}  {} repo(s)  {} {}",
                name.cyan().bold(),
                set.repos.len(),
                "skills:".dimmed(),
                set.skills_dir
            );
        }
    }

    println!();
    println!("{}", "Active Features".bold().underline());
    if config.features.is_empty() {
        println!(
            "  {}",
            "No active features. Use 'thicket add <set> <feature>' to start work.".dimmed()
        );
    } else {
        for (name, feature) in &config.features {
            println!(
                "  {} {}  {}",
                name.magenta().bold(),
                format!("(set: {})", feature.set).dimmed(),
                feature.path
            );
        }
    }
    Ok(())
}

/// Render `"<ahead>\t<behind>"` as arrows, pass anything else through.
fn format_ahead_behind(ahead_behind: &str) -> String {
    match ahead_behind.split_once('\t') {
        Some((ahead, behind)) => format!("↑{} ↓{}", ahead, behind),
        None => ahead_behind.to_string(),
    }
}

fn print_status_table(feature: &str, statuses: &[RepoStatus]) {
    println!("{}", format!("Feature status: {}", feature).bold());
    println!(
        "  {} {} {} {}",
        format!("{:<18}", "REPO").bold(),
        format!("{:<16}", "BRANCH").bold(),
        format!("{:<8}", "STATE").bold(),
        "SYNC".bold()
    );
    for status in statuses {
        let state = if status.dirty {
            format!("{:<8}", "dirty").red()
        } else {
            format!("{:<8}", "clean").green()
        };
        println!(
            "  {:<18} {:<16} {} {}",
            status.name,
            status.branch,
            state,
            format_ahead_behind(&status.ahead_behind)
        );
    }
}

async fn handle_status(manager: &FeatureManager, feature: &str) -> Result<()> {
    let statuses = manager.feature_status(feature).await?;
    print_status_table(feature, &statuses);
    Ok(())
}

async fn handle_sync(manager: &FeatureManager, feature: &str) -> Result<()> {
    println!("{} feature '{}'...", "Syncing:".green(), feature);
    manager.sync_feature(feature).await?;
    println!("{} all repositories synced", "Done:".green());
    Ok(())
}

fn print_exec_report(report: &ExecReport) {
    for run in &report.runs {
        println!();
        println!("{}", format!("--- [{}] ---", run.name).bold());
        if !run.output.is_empty() {
            println!("{}", run.output);
        }
        if !run.success() {
            println!("{}", format!("exit code: {}", run.exit_code).red());
        }
    }
}

async fn handle_exec(manager: &FeatureManager, feature: &str, command: Vec<String>) -> Result<()> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| eyre::eyre!("usage: thicket exec <feature> -- <command> [args...]"))?;

    let report = manager.exec_feature(feature, program, args).await?;
    print_exec_report(&report);

    if report.failed > 0 {
        eprintln!(
            "{}",
            format!("{} of {} repo(s) failed", report.failed, report.runs.len()).red()
        );
        std::process::exit(1);
    }
    Ok(())
}

fn handle_switch(manager: &FeatureManager, feature: &str) -> Result<()> {
    println!("{}", manager.feature_path(feature)?.display());
    Ok(())
}

fn handle_init() -> Result<()> {
    let shell_integration = r#"# thicket shell integration
thicket() {
    if [ "$1" = "switch" ]; then
        local path
        path=$(command thicket switch "$2" 2>&1)
        local exit_code=$?
        if [ $exit_code -eq 0 ] && [ -n "$path" ]; then
            cd "$path" || return 1
        else
            echo "$path" >&2
            return $exit_code
        fi
    else
        command thicket "$@"
    fi
}"#;
    println!("{}", shell_integration);
    Ok(())
}

fn handle_skills_list(manager: &FeatureManager, set: &str) -> Result<()> {
    let config = manager.config();
    let set_config = config
        .sets
        .get(set)
        .ok_or_else(|| eyre::eyre!("set '{}' not found", set))?;
    println!("Skills directory for '{}': {}", set, set_config.skills_dir);
    Ok(())
}

fn handle_skills_set_dir(manager: &mut FeatureManager, set: &str, path: &str) -> Result<()> {
    manager.set_skills_dir(set, path)?;
    println!(
        "{} skills directory for '{}' is now {}",
        "Updated:".green(),
        set,
        path
    );
    Ok(())
}

async fn handle_shortcut(manager: &FeatureManager, args: Vec<String>) -> Result<()> {
    let (feature, tool_args) = args
        .split_first()
        .ok_or_else(|| eyre::eyre!("usage: thicket <feature> [tool [args...]]"))?;

    let path = manager.feature_path(feature)?;

    match tool_args.split_first() {
        None => {
            println!("{}", path.display());
            Ok(())
        }
        Some((tool, rest)) => {
            info!("launching {} in {}", tool, path.display());
            println!("{} {} in {}", "Launching:".cyan(), tool, path.display());
            let status = tokio::process::Command::new(tool)
                .args(rest)
                .current_dir(&path)
                .status()
                .await
                .context(format!("failed to launch {}", tool))?;
            std::process::exit(status.code().unwrap_or(1));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load the registry
    let config = Config::load(cli.config.as_deref()).context("Failed to load registry")?;

    info!("Starting with registry from: {}", config.file_path().display());

    // Run the main application logic
    run_application(cli, config).await.context("Application failed")?;

    Ok(())
}
