use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "timescore", version, about = "Score how you spend your time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Behavior catalog
    Behavior {
        #[command(subcommand)]
        action: commands::behavior::BehaviorAction,
    },
    /// Record a behavior and print its score
    Record(commands::record::RecordArgs),
    /// Today's state and records
    Today,
    /// Archived daily totals
    History {
        /// Number of most recent days
        #[arg(long, default_value_t = 7)]
        days: usize,
    },
    /// Wish exchange
    Wish {
        #[command(subcommand)]
        action: commands::wish::WishAction,
    },
    /// Unlocked achievements
    Achievements,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Behavior { action } => commands::behavior::run(action),
        Commands::Record(args) => commands::record::run(args),
        Commands::Today => commands::today::run(),
        Commands::History { days } => commands::today::history(days),
        Commands::Wish { action } => commands::wish::run(action),
        Commands::Achievements => commands::today::achievements(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
