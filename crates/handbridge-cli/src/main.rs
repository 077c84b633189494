mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, mapping::MapSubcommand, signal::SignalSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "handbridge",
    about = "Aggregate discrete sensor signals and dispatch mapped actions to a robotic hand",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: nearest directory with handbridge.yaml)
    #[arg(long, global = true, env = "HANDBRIDGE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create handbridge.yaml, signals.json and mapping.json
    Init,

    /// Run the ingestion and dispatch server
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Declare and inspect signals
    Signal {
        #[command(subcommand)]
        subcommand: SignalSubcommand,
    },

    /// Edit and inspect the action mapping
    Map {
        #[command(subcommand)]
        subcommand: MapSubcommand,
    },

    /// Send one gesture straight to the gesture service
    Send {
        /// Gesture name, e.g. fist
        #[arg(long, required_unless_present = "list")]
        gesture: Option<String>,

        /// Ask the hand to keep the thumb clear
        #[arg(long)]
        thumb_clearance: bool,

        /// Gesture service base URL (default: gesture.base_url from config)
        #[arg(long)]
        server: Option<String>,

        /// List the gestures the service knows instead
        #[arg(long, conflicts_with = "gesture")]
        list: bool,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
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
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Signal { subcommand } => cmd::signal::run(&root, subcommand, cli.json),
        Commands::Map { subcommand } => cmd::mapping::run(&root, subcommand, cli.json),
        Commands::Send {
            gesture,
            thumb_clearance,
            server,
            list,
        } => {
            let opts = cmd::send::SendOptions {
                gesture,
                thumb_clearance,
                server,
                list,
            };
            cmd::send::run(&root, opts, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
