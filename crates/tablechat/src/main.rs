//! tablechat - talk to an Airtable record

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

use commands::{chat_command, init_command, serve_command, status_command, ChatArgs};

/// tablechat - chat with an Airtable record
#[derive(Parser)]
#[command(name = "tablechat")]
#[command(about = "Chat with an Airtable record through a language model")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and conversation store
    Init,
    /// Show configuration status
    Status,
    /// Chat about a record
    Chat {
        /// Message to send; interactive mode when omitted
        #[arg(short, long)]
        message: Option<String>,
        /// Record the conversation is about
        #[arg(long)]
        record_id: String,
        /// Kind of page the chat is attached to
        #[arg(long, default_value = "record")]
        page_type: String,
        /// Table the record lives in
        #[arg(long)]
        table: Option<String>,
        /// Load the record's current fields from Airtable
        #[arg(long, conflicts_with = "fields")]
        fetch: bool,
        /// Current record fields as a JSON object
        #[arg(long)]
        fields: Option<String>,
        /// Clear the stored conversation first
        #[arg(long)]
        reset: bool,
    },
    /// Start the HTTP server
    Serve {
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Serve { verbose: true }) {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Status => status_command().await,
        Commands::Chat {
            message,
            record_id,
            page_type,
            table,
            fetch,
            fields,
            reset,
        } => {
            chat_command(ChatArgs {
                message,
                record_id,
                page_type,
                table,
                fetch,
                fields,
                reset,
            })
            .await
        }
        Commands::Serve { verbose: _ } => serve_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
