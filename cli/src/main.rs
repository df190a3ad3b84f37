use clap::{Args, Parser, Subcommand};
use skillpack_core::config::{GLOBAL_FLAG_ENV, Scope};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod skills;

#[derive(Parser)]
#[command(name = "skillpack")]
#[command(about = "skillpack - install packaged skills into .claude/skills", long_about = None)]
struct Cli {
    /// Directory holding .claude-skill.json, package.json and SKILL.md
    #[arg(long, global = true, default_value = ".")]
    package_dir: PathBuf,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Install(ScopeArgs),
    #[command(alias = "remove")]
    Uninstall(ScopeArgs),
    List(ScopeArgs),
}

#[derive(Args, Clone, Copy, Debug)]
struct ScopeArgs {
    /// Use ~/.claude/skills
    #[arg(short, long, conflicts_with = "local")]
    global: bool,

    /// Use ./.claude/skills
    #[arg(short, long)]
    local: bool,
}

impl ScopeArgs {
    fn resolve(self) -> Scope {
        if self.global {
            Scope::Global
        } else if self.local {
            Scope::Local
        } else {
            Scope::from_global_flag(std::env::var(GLOBAL_FLAG_ENV).ok().as_deref())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Install(scope) => skills::install(&cli.package_dir, scope.resolve()),
        Commands::Uninstall(scope) => skills::uninstall(&cli.package_dir, scope.resolve()),
        Commands::List(scope) => skills::list(scope.resolve()),
    };

    exit_code(&result)
}

/// Any failed operation, uninstall included, exits with status 1.
fn exit_code(result: &anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
