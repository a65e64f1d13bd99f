//! Command implementations

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use tablechat_agent::{ChatSession, Orchestrator, PageContext};
use tablechat_airtable::{fields_from_json, AirtableClient, Fields};
use tablechat_config::{self, Config};
use tablechat_provider::OpenRouterProvider;
use tablechat_server::AppState;
use tablechat_session::{ConversationStore, FileStore, KeyValueStore, Role};

/// Options of the `chat` command
pub struct ChatArgs {
    pub message: Option<String>,
    pub record_id: String,
    pub page_type: String,
    pub table: Option<String>,
    pub fetch: bool,
    pub fields: Option<String>,
    pub reset: bool,
}

/// Write a default config and create the store directory
pub async fn init_command() -> Result<()> {
    println!("Initializing tablechat...");

    let config = tablechat_config::init()
        .await
        .context("Failed to initialize config")?;

    println!("Config: {}", tablechat_config::config_path().display());
    println!("Store:  {}", config.store_path().display());
    println!("\nNext steps:");
    println!("  1. Add a model API key and Airtable credentials to ~/.tablechat/config.json");
    println!("  2. Chat about a record: tablechat chat --record-id recXXXX -m \"Hello\"");

    Ok(())
}

pub async fn status_command() -> Result<()> {
    let config_path = tablechat_config::config_path();

    println!("tablechat status");
    println!(
        "Config:   {} {}",
        config_path.display(),
        if config_path.exists() { "[OK]" } else { "[Missing]" }
    );

    let config = Config::load().await.context("Failed to load config")?;
    let store = config.store_path();
    println!(
        "Store:    {} {}",
        store.display(),
        if store.exists() { "[OK]" } else { "[Missing]" }
    );
    println!("Model:    {}", config.default_model());
    println!(
        "API Key:  {}",
        if config.has_api_key() { "[Set]" } else { "[Missing]" }
    );
    println!(
        "Airtable: {}",
        if config.has_airtable_credentials() {
            "[Set]"
        } else {
            "[Missing]"
        }
    );
    println!("Server:   http://{}", config.bind_addr());
    println!("Origin:   {}", config.server.allowed_origin);

    Ok(())
}

fn provider_from(config: &Config) -> Result<OpenRouterProvider> {
    let api_key = config
        .api_key()
        .context("No API key configured. Set one in ~/.tablechat/config.json")?;
    Ok(OpenRouterProvider::new(
        api_key,
        config.api_base(),
        Some(config.default_model()),
    ))
}

/// Parse `--fields` or fetch the record, in that order
async fn initial_fields(args: &ChatArgs, config: &Config, client: &AirtableClient) -> Result<Fields> {
    if let Some(raw) = &args.fields {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("--fields is not valid JSON")?;
        return fields_from_json(value).context("--fields must be a JSON object");
    }

    if args.fetch {
        let table = args
            .table
            .clone()
            .or_else(|| config.airtable.default_table.clone())
            .context("--fetch needs --table or airtable.default_table")?;
        let fields = client
            .get_record(&table, &args.record_id)
            .await
            .with_context(|| format!("Failed to fetch {}/{}", table, args.record_id))?;
        info!("Loaded {} field(s) from {}/{}", fields.len(), table, args.record_id);
        return Ok(fields);
    }

    Ok(Fields::new())
}

async fn print_reply<S: KeyValueStore>(
    session: &ChatSession<OpenRouterProvider, S>,
    text: &str,
) -> Result<()> {
    let messages = session.submit(text).await.context("Failed to store conversation")?;
    if let Some(reply) = messages.last().filter(|m| m.role == Role::Assistant) {
        println!("\n{}\n", reply.content);
    }
    Ok(())
}

/// Chat about a record from the terminal
pub async fn chat_command(args: ChatArgs) -> Result<()> {
    let mut config = Config::load().await.context("Failed to load config")?;
    if let Some(table) = &args.table {
        config.airtable.default_table = Some(table.clone());
    }

    let provider = provider_from(&config)?;
    if !config.has_airtable_credentials() {
        bail!("No Airtable credentials configured. Set airtable.api_key and airtable.base_id");
    }
    let client = Arc::new(AirtableClient::from_config(&config.airtable));

    let fields = initial_fields(&args, &config, &client).await?;
    let orchestrator = Arc::new(Orchestrator::with_config(provider, client, &config));

    let store = ConversationStore::new(FileStore::new(config.store_path()));
    let session = ChatSession::new(
        orchestrator,
        store,
        PageContext {
            page_type: args.page_type.clone(),
            record_id: args.record_id.clone(),
            fields,
        },
    );

    if args.reset {
        session.reset().await.context("Failed to clear conversation")?;
    }

    if let Some(message) = &args.message {
        return print_reply(&session, message).await;
    }

    println!("Interactive mode for {} (type 'exit' to quit)", args.record_id);
    for msg in session.history().await? {
        println!("{}: {}", msg.role.as_str(), msg.content);
    }

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        print_reply(&session, input).await?;
    }

    Ok(())
}

/// Serve the chat page, server action and relay
pub async fn serve_command() -> Result<()> {
    let config = Config::load().await.context("Failed to load config")?;
    let provider = provider_from(&config)?;

    if !config.has_airtable_credentials() {
        warn!("No Airtable credentials configured; record updates will fail");
    }
    let client = Arc::new(AirtableClient::from_config(&config.airtable));

    let orchestrator = Arc::new(Orchestrator::with_config(provider, client, &config));
    let state = AppState::new(orchestrator, &config.server).context("Invalid server config")?;

    info!(
        "Relay allows origin {}, max duration {}s",
        config.server.allowed_origin, config.server.max_duration_secs
    );

    tablechat_server::serve(Arc::new(state), &config.bind_addr())
        .await
        .context("Server stopped")?;
    Ok(())
}
