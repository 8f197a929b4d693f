mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::template::TemplateSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "playbook",
    about = "Playbook progress engine — ordered step templates, per-user journeys, guarded completion",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .playbook/ or .git/)
    #[arg(long, global = true, env = "PLAYBOOK_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize playbook storage in the current project
    Init,

    /// Manage playbook templates
    Template {
        #[command(subcommand)]
        subcommand: TemplateSubcommand,
    },

    /// Show one user's progress through a playbook
    Show {
        /// Playbook slug
        slug: String,
        /// User id
        #[arg(long)]
        user: String,
    },

    /// Complete (or amend) a step of a playbook
    Complete {
        /// Playbook slug
        slug: String,
        /// Step id
        step_id: String,
        /// User id
        #[arg(long)]
        user: String,
        /// Response payload as a JSON document
        #[arg(long)]
        response: Option<String>,
    },

    /// Show the journey a user should resume
    Active {
        /// User id
        #[arg(long)]
        user: String,
    },

    /// List a user's journeys
    Journeys {
        /// User id
        #[arg(long)]
        user: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Template { subcommand } => cmd::template::run(&root, subcommand, cli.json),
        Commands::Show { slug, user } => cmd::journey::show(&root, &slug, &user, cli.json),
        Commands::Complete {
            slug,
            step_id,
            user,
            response,
        } => cmd::journey::complete(
            &root,
            &slug,
            &step_id,
            &user,
            response.as_deref(),
            cli.json,
        ),
        Commands::Active { user } => cmd::journey::active(&root, &user, cli.json),
        Commands::Journeys { user } => cmd::journey::list(&root, &user, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
