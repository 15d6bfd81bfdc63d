mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tablecall")]
#[command(about = "Real-time table service calls for restaurant staff", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway server
    Serve {
        #[arg(short, long, default_value = "8787")]
        port: u16,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Print the active (non-done) calls as JSON
    Active {
        #[arg(short, long)]
        table: Option<String>,
    },
    /// Move a call, or every active call of a table, forward
    Resolve {
        #[arg(required_unless_present = "table", conflicts_with = "table")]
        id: Option<String>,
        #[arg(short, long)]
        table: Option<String>,
        /// processing or done
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Follow the staff view, or one table's diner view with --table
    Watch {
        #[arg(short, long)]
        table: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await,
        Commands::Active { table } => commands::active::run(table).await,
        Commands::Resolve { id, table, status } => commands::resolve::run(id, table, status).await,
        Commands::Watch { table } => commands::watch::run(table).await,
    }
}
