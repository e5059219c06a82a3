use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, registry};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "watchsync")]
#[command(about = "WatchSync - Keep your media library and tracking service in step")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    #[command(long_about = "View or create the configuration file. Running without a subcommand shows the current configuration.")]
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
    /// Inspect the persisted sync registries
    #[command(long_about = "Show the skip and already-exists registries that gate what the sync engine pushes to the tracking service.")]
    Registry {
        #[command(subcommand)]
        cmd: RegistryCommands,
    },
    /// Clear persisted state
    #[command(long_about = "Clear persisted sync state. Use --registries to clear the skip and already-exists registries, or --all to wipe the whole state directory.")]
    Clear {
        /// Clear everything under the state directory
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "registries")]
        all: bool,

        /// Clear the skip and already-exists registries
        #[arg(long, action = ArgAction::SetTrue)]
        registries: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Write a default configuration file
    #[command(long_about = "Write a default configuration file to the config directory. Refuses to overwrite an existing file unless --force is given.")]
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum RegistryCommands {
    /// Show registry contents
    Show,

    /// Clear one or both registries
    Clear {
        /// Clear only the skip registry
        #[arg(long, action = ArgAction::SetTrue)]
        skip: bool,

        /// Clear only the already-exists registry
        #[arg(long, action = ArgAction::SetTrue)]
        already_exists: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show);
            config::run_config(cmd, &output).await
        }
        Commands::Registry { cmd } => registry::run_registry(cmd, &output).await,
        Commands::Clear { all, registries } => clear::run_clear(all, registries, &output).await,
    }
}
