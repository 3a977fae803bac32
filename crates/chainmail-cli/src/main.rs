//! # chainmail
//!
//! Command-line front end for the Chainmail messaging overlay.
//!
//! This binary provides:
//! - **inbox** snapshot display, served instantly from the durable cache and
//!   refreshed by a single poll
//! - **watch**, the long-running poll loop that prints the inbox whenever the
//!   server's answer actually differs
//! - **chat** view and **send** for one conversation
//! - **nft** metadata lookup through the provider fallback chain

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chainmail_client::metadata::MetadataResolution;
use chainmail_client::scheduler::schedule;
use chainmail_client::sync::PollOutcome;
use chainmail_client::{ChatSession, ClientConfig};
use chainmail_store::CacheStore;
use chainmail_types::{Address, Chain, InboxSnapshot};

#[derive(Parser)]
#[command(name = "chainmail", version, about = "Wallet-addressed messaging client")]
struct Cli {
    /// Wallet address to act as.
    #[arg(long, env = "CHAINMAIL_ACCOUNT")]
    account: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the inbox (cached immediately, then refreshed once).
    Inbox,
    /// Poll the inbox continuously, printing every accepted change.
    Watch,
    /// Show the conversation with another address.
    Conversation {
        /// Counterparty wallet address.
        counterparty: String,
    },
    /// Send a message to another address.
    Send {
        /// Recipient wallet address.
        to: String,
        /// Message body.
        body: String,
    },
    /// Resolve NFT metadata for a token.
    Nft {
        /// Chain slug (ethereum or polygon).
        chain: String,
        /// Token contract address.
        contract: String,
        /// Token id.
        token_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chainmail=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    let account = Address::parse(&cli.account).context("invalid account address")?;

    let store = Arc::new(CacheStore::open_default().context("opening cache database")?);
    if let Some(path) = store.path() {
        info!(db = %path.display(), "cache database opened");
    }

    let session = Arc::new(ChatSession::new(&config, account, store));

    match cli.command {
        Command::Inbox => inbox(&session).await,
        Command::Watch => watch(session, &config).await,
        Command::Conversation { counterparty } => conversation(&session, &counterparty).await,
        Command::Send { to, body } => send(&session, &to, &body).await,
        Command::Nft {
            chain,
            contract,
            token_id,
        } => nft(&session, &chain, &contract, token_id).await,
    }
}

async fn inbox(session: &ChatSession) -> anyhow::Result<()> {
    let cached = session.inbox();
    if !cached.is_empty() {
        print_inbox(&cached);
    }

    match session.poll_inbox().await {
        Ok(PollOutcome::Updated) => print_inbox(&session.inbox()),
        Ok(PollOutcome::Unchanged) => {}
        Err(e) => {
            warn!(error = %e, "inbox refresh failed; showing cached state");
            if cached.is_empty() {
                print_inbox(&cached);
            }
        }
    }
    Ok(())
}

async fn watch(session: Arc<ChatSession>, config: &ClientConfig) -> anyhow::Result<()> {
    info!(interval = ?config.poll_interval, "watching inbox");

    // Poll failures are already logged and flagged by the synchronizer.
    let handle = schedule(config.poll_interval, move || {
        let session = session.clone();
        async move {
            if let Ok(PollOutcome::Updated) = session.poll_inbox().await {
                print_inbox(&session.inbox());
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    handle.cancel();
    Ok(())
}

async fn conversation(session: &ChatSession, counterparty: &str) -> anyhow::Result<()> {
    let counterparty = Address::parse(counterparty).context("invalid counterparty address")?;
    let messages = session
        .conversation(&counterparty)
        .await
        .context("fetching conversation")?;

    for entry in &messages {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}

async fn send(session: &ChatSession, to: &str, body: &str) -> anyhow::Result<()> {
    let to = Address::parse(to).context("invalid recipient address")?;
    let created = session.send(&to, body).await.context("sending message")?;
    println!("{}", serde_json::to_string(&created)?);
    Ok(())
}

async fn nft(
    session: &ChatSession,
    chain: &str,
    contract: &str,
    token_id: i64,
) -> anyhow::Result<()> {
    let chain = Chain::from_slug(chain)?;
    let contract = Address::parse(contract).context("invalid contract address")?;

    match session.resolve_nft(chain, &contract, token_id).await? {
        MetadataResolution::Resolved { metadata, .. } => {
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        MetadataResolution::Pending => {
            println!("resolution already in flight; try again shortly");
        }
    }
    Ok(())
}

fn print_inbox(snapshot: &InboxSnapshot) {
    if snapshot.is_empty() {
        println!("inbox is empty");
        return;
    }
    for entry in snapshot.entries() {
        println!(
            "{} {} [{}] {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            if entry.read { " " } else { "*" },
            entry.context,
            entry.from_addr,
        );
    }
}
