use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use shiplane_core::DeploymentRef;

mod commands;
mod exit;

#[derive(Parser)]
#[command(
    name = "shiplane",
    about = "shiplane — promote the latest dev image and roll it out",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to shiplane.toml (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the promotion ledger database
    #[arg(long, global = true, default_value = "shiplane-ledger.redb")]
    ledger: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Promote the latest dev tag and roll the target onto it.
    ///
    /// Exit codes: 0 healthy, 2 no dev artifact, 3 malformed tag,
    /// 4 promotion conflict, 5 rollout failed (rolled back),
    /// 6 rollback failed, 7 registry unavailable.
    PromoteAndDeploy {
        /// Repository to promote from
        #[arg(long)]
        repo: String,
        /// Deployment target, namespace/name
        #[arg(long)]
        target: DeploymentRef,
    },
    /// Promote without deploying
    Promote {
        /// Repository to promote from
        #[arg(long)]
        repo: String,
        /// Dev tag to promote (default: latest dev tag)
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print the latest dev tag in a repository
    Latest {
        #[arg(long)]
        repo: String,
    },
    /// Print promotion history for a repository
    History {
        #[arg(long)]
        repo: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shiplane=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::PromoteAndDeploy { repo, target } => {
            commands::deploy::promote_and_deploy(&cli, repo, target).await
        }
        Commands::Promote { repo, tag } => {
            commands::deploy::promote(&cli, repo, tag.as_deref()).await
        }
        Commands::Latest { repo } => commands::query::latest(&cli, repo).await,
        Commands::History { repo, format } => commands::query::history(&cli, repo, format),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit::code_for(&e))
        }
    }
}

impl Cli {
    fn config_path(&self) -> Option<&std::path::Path> {
        self.config.as_deref()
    }

    fn ledger_path(&self) -> &std::path::Path {
        &self.ledger
    }
}
