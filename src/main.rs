use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use phased::models::{DependencyGate, WorkflowConfig};
use phased::router::{Command as RouterCommand, Router};
use phased::store::FileStateStore;
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phased")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Staged document-approval workflow coordinator", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Store root directory
    #[arg(long, global = true, default_value = "phased")]
    root: String,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Enable the optional prd stage between plan and tasks
    #[arg(long, global = true)]
    with_prd: bool,

    /// Fail the first stage when declared dependency phases are incomplete
    #[arg(long, global = true)]
    strict_deps: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the specification artifact for a phase
    Spec {
        /// Phase ID (e.g. 06-auth-flow)
        phase_id: String,

        /// Instructions forwarded to the stage generator
        payload: Option<String>,

        /// Change description (triggers precedent check and cascade)
        #[arg(short, long)]
        changes: Option<String>,

        /// Override the declared dependency phases
        #[arg(short, long, value_delimiter = ',')]
        depends: Option<Vec<String>>,
    },

    /// Generate the research artifact for a phase
    Research {
        phase_id: String,
        payload: Option<String>,
        #[arg(short, long)]
        changes: Option<String>,
    },

    /// Generate the plan artifact for a phase
    Plan {
        phase_id: String,
        payload: Option<String>,
        #[arg(short, long)]
        changes: Option<String>,
    },

    /// Generate the prd artifact for a phase (requires --with-prd)
    Prd {
        phase_id: String,
        payload: Option<String>,
        #[arg(short, long)]
        changes: Option<String>,
    },

    /// Generate the task breakdown for a phase
    Tasks {
        phase_id: String,
        payload: Option<String>,
        #[arg(short, long)]
        changes: Option<String>,
    },

    /// Show the workflow status of a phase
    Status {
        phase_id: String,
    },

    /// Approve or reject a stage artifact
    Approve {
        phase_id: String,

        /// Stage being decided (spec|research|plan|prd|tasks)
        stage: String,

        /// Record a rejection instead of an approval
        #[arg(long)]
        reject: bool,

        /// Approver identity
        #[arg(long)]
        by: Option<String>,

        /// Reviewer comments
        #[arg(long)]
        comments: Option<String>,

        /// Feedback items driving the next revision (repeatable)
        #[arg(short, long)]
        feedback: Vec<String>,
    },

    /// Check persisted state documents for corruption
    Doctor {
        /// Limit the probe to one phase
        phase_id: Option<String>,
    },

    /// Restore a phase from its newest usable backup
    Restore {
        phase_id: String,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = WorkflowConfig {
        include_prd: cli.with_prd,
        dependency_gate: if cli.strict_deps {
            DependencyGate::Enforce
        } else {
            DependencyGate::Informational
        },
    };
    let store = Arc::new(FileStateStore::new(&cli.root));
    let router = Router::with_defaults(store.clone(), config);

    let ok = match cli.command {
        Commands::Spec {
            phase_id,
            payload,
            changes,
            depends,
        } => {
            phased::cli::stage::run(
                &router,
                RouterCommand::Spec,
                &phase_id,
                payload,
                changes,
                depends,
                cli.json,
            )
            .await?
        }
        Commands::Research {
            phase_id,
            payload,
            changes,
        } => {
            phased::cli::stage::run(
                &router,
                RouterCommand::Research,
                &phase_id,
                payload,
                changes,
                None,
                cli.json,
            )
            .await?
        }
        Commands::Plan {
            phase_id,
            payload,
            changes,
        } => {
            phased::cli::stage::run(
                &router,
                RouterCommand::Plan,
                &phase_id,
                payload,
                changes,
                None,
                cli.json,
            )
            .await?
        }
        Commands::Prd {
            phase_id,
            payload,
            changes,
        } => {
            phased::cli::stage::run(
                &router,
                RouterCommand::Prd,
                &phase_id,
                payload,
                changes,
                None,
                cli.json,
            )
            .await?
        }
        Commands::Tasks {
            phase_id,
            payload,
            changes,
        } => {
            phased::cli::stage::run(
                &router,
                RouterCommand::Tasks,
                &phase_id,
                payload,
                changes,
                None,
                cli.json,
            )
            .await?
        }
        Commands::Status { phase_id } => {
            phased::cli::status::run(&router, &phase_id, cli.json).await?
        }
        Commands::Approve {
            phase_id,
            stage,
            reject,
            by,
            comments,
            feedback,
        } => {
            phased::cli::approve::run(
                &router, &phase_id, &stage, reject, by, comments, feedback, cli.json,
            )
            .await?
        }
        Commands::Doctor { phase_id } => {
            phased::cli::doctor::run(store.as_ref(), phase_id, cli.json).await?
        }
        Commands::Restore { phase_id } => {
            phased::cli::restore::run(store.as_ref(), &phase_id, cli.json).await?
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
