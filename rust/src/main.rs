use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use cscope_project::project::{StatusReport, UpdateReport};
use cscope_project::serve;
use cscope_project::{ConsoleHost, CscopeError, ExCommandHost, ProjectContext, QueryHost, Settings};
use dotenv::dotenv;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cscope-project")]
#[command(about = "Build and refresh cscope indexes for projects described by cscope.cfg")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Where host commands go: human-readable lines or vim ex commands
    #[arg(long, value_enum, default_value = "human", global = true)]
    emit: Emit,

    /// Base directory for per-project index workspaces (overrides CSCOPE_DIR)
    #[arg(long, value_name = "DIR", global = true)]
    cscope_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the project configuration and prepare its workspace
    Start {
        /// Configuration file (default: ./cscope.cfg)
        config: Option<String>,

        /// Build the index right away
        #[arg(long)]
        update: bool,

        /// Register the query key mappings
        #[arg(long)]
        map_keys: bool,
    },
    /// Regenerate cscope.files and cscope.out
    Update {
        /// Configuration file (default: ./cscope.cfg)
        config: Option<String>,
    },
    /// Print the query key mappings
    MapKeys,
    /// Show the project, its workspace and the generated artifacts
    Status {
        /// Configuration file (default: ./cscope.cfg)
        config: Option<String>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the project's workspace
    Clean {
        /// Configuration file (default: ./cscope.cfg)
        config: Option<String>,
    },
    /// Read commands from stdin, keeping one index session open
    Serve,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Human,
    Ex,
}

fn main() -> Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.cscope_dir.clone() {
        settings.cscope_dir = dir;
    }
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;

    match cli.emit {
        Emit::Human => run(ProjectContext::new(settings, ConsoleHost), cli.command, &cwd),
        Emit::Ex => run(
            ProjectContext::new(settings, ExCommandHost::new(io::stdout())),
            cli.command,
            &cwd,
        ),
    }
}

fn run<H: QueryHost>(mut ctx: ProjectContext<H>, command: Commands, cwd: &Path) -> Result<ExitCode> {
    let ok = match command {
        Commands::Start {
            config,
            update,
            map_keys,
        } => {
            let outcome = match ctx.start(config.as_deref(), cwd) {
                Ok(outcome) => outcome,
                Err(e) => return fail(&mut ctx, "Couldn't start CScope", e),
            };
            log::info!("Started from {}", outcome.config_path.display());
            let mut ok = true;
            if let Some(report) = outcome.update {
                ok &= report_update(&mut ctx, report)?;
            } else if update {
                let report = ctx.update();
                ok &= report_update(&mut ctx, report)?;
            }
            if let Some(Err(e)) = outcome.mapped_keys {
                return fail(&mut ctx, "Couldn't map keys", e);
            }
            if map_keys {
                if let Err(e) = ctx.map_keys() {
                    return fail(&mut ctx, "Couldn't map keys", e);
                }
            }
            ok
        }
        Commands::Update { config } => {
            if let Err(e) = ctx.configure(config.as_deref(), cwd) {
                return fail(&mut ctx, "Couldn't start CScope", e);
            }
            let report = ctx.update();
            report_update(&mut ctx, report)?
        }
        Commands::MapKeys => match ctx.map_keys() {
            Ok(_) => true,
            Err(e) => return fail(&mut ctx, "Couldn't map keys", e),
        },
        Commands::Status { config, json } => {
            if let Err(e) = ctx.inspect(config.as_deref(), cwd) {
                return fail(&mut ctx, "Couldn't start CScope", e);
            }
            let status = ctx.status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
            true
        }
        Commands::Clean { config } => {
            if let Err(e) = ctx.inspect(config.as_deref(), cwd) {
                return fail(&mut ctx, "Couldn't start CScope", e);
            }
            let workspace = ctx.workspace().filter(|w| w.exists()).map(|w| w.dir());
            if let Err(e) = ctx.teardown(true) {
                return fail(&mut ctx, "Couldn't remove workspace", e);
            }
            if let Some(dir) = workspace {
                println!("{}", format!("Removed {}", dir.display()).green());
            }
            true
        }
        Commands::Serve => {
            let stdin = io::stdin();
            serve::run(&mut ctx, stdin.lock(), cwd).context("Query host went away")?;
            true
        }
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Sends each failed step to the host; returns whether everything succeeded.
fn report_update<H: QueryHost>(
    ctx: &mut ProjectContext<H>,
    report: cscope_project::Result<UpdateReport>,
) -> Result<bool> {
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            fail(ctx, "Couldn't update CScope", e)?;
            return Ok(false);
        }
    };
    for failure in report.failures() {
        ctx.host_mut().message(&failure)?;
    }
    if let Ok(list) = &report.file_list {
        log::info!("{} files listed in {}", list.entries, list.path.display());
    }
    Ok(report.is_success())
}

fn fail<H: QueryHost>(ctx: &mut ProjectContext<H>, prefix: &str, err: CscopeError) -> Result<ExitCode> {
    ctx.host_mut()
        .message(&format!("{}: {}", prefix, err))
        .context("Failed to report error")?;
    Ok(ExitCode::FAILURE)
}

fn print_status(status: &StatusReport) {
    println!(
        "{} {}",
        "Stage:".bold(),
        status.stage.to_string().bright_blue()
    );
    let Some(project) = &status.project else {
        return;
    };
    println!("{} {}", "Project:".bold(), project.green());
    if let Some(path) = &status.config_path {
        println!("  {} {}", "Config:".bright_blue(), path.display());
    }
    if let Some(root) = &status.root_path {
        println!("  {} {}", "Root:".bright_blue(), root.display());
    }
    println!(
        "  {} {}",
        "Patterns:".bright_blue(),
        status.file_patterns.join(", ")
    );
    for lib in &status.library_paths {
        println!("  {} {}", "Library:".bright_blue(), lib.display());
    }
    if let Some(dir) = &status.workspace {
        println!("  {} {}", "Workspace:".bright_blue(), dir.display());
    }
    if let Some(cmd) = &status.file_set_command {
        println!("  {} {}", "Discovery:".bright_blue(), cmd);
    }
    match &status.file_list {
        Some(list) => println!(
            "  {} {} files, {} bytes, sha256 {}",
            "cscope.files:".bright_cyan(),
            list.lines.unwrap_or(0),
            list.bytes,
            list.sha256.as_deref().unwrap_or("-")
        ),
        None => println!("  {} {}", "cscope.files:".bright_cyan(), "missing".yellow()),
    }
    match &status.index {
        Some(index) => println!(
            "  {} {} bytes, built {}",
            "cscope.out:".bright_cyan(),
            index.bytes,
            index
                .modified
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        None => println!("  {} {}", "cscope.out:".bright_cyan(), "missing".yellow()),
    }
}
