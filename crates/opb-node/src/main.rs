//! OPB node binary: `run`, `balances list`, and `wallet new`.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod node;
mod sync;

use config::NodeConfig;
use node::Node;

/// The one-piece berries ledger CLI.
#[derive(Parser, Debug)]
#[command(name = "opb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log_level", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the node: HTTP API, peer sync, and mining
    Run(RunArgs),
    /// Inspect account balances
    Balances {
        #[command(subcommand)]
        command: BalancesCommand,
    },
    /// Manage keystore accounts
    Wallet {
        #[command(subcommand)]
        command: WalletCommand,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Absolute path to the node data dir where the DB is stored
    #[arg(long = "data_dir")]
    data_dir: PathBuf,

    /// IP to listen on
    #[arg(long, default_value = config::DEFAULT_IP)]
    ip: String,

    /// Port to listen on
    #[arg(long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Account credited for mined blocks
    #[arg(long, default_value = config::DEFAULT_MINER)]
    miner: String,

    /// Miner account of the bootstrap node
    #[arg(long = "bootstrap_account", default_value = config::DEFAULT_BOOTSTRAP_ACCOUNT)]
    bootstrap_account: String,

    /// IP of the bootstrap node; empty disables bootstrapping
    #[arg(long = "bootstrap_ip", default_value = config::DEFAULT_BOOTSTRAP_IP)]
    bootstrap_ip: String,

    /// Port of the bootstrap node; 0 disables bootstrapping
    #[arg(long = "bootstrap_port", default_value_t = config::DEFAULT_BOOTSTRAP_PORT)]
    bootstrap_port: u16,
}

#[derive(Subcommand, Debug)]
enum BalancesCommand {
    /// Print all account balances at the current tip
    List {
        #[arg(long = "data_dir")]
        data_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    /// Generate a new account and write its encrypted keystore file
    New {
        #[arg(long = "data_dir")]
        data_dir: PathBuf,

        /// Password protecting the new key
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Run(args) => run_node(args).await,
        Command::Balances {
            command: BalancesCommand::List { data_dir },
        } => list_balances(&data_dir),
        Command::Wallet {
            command: WalletCommand::New { data_dir, password },
        } => new_wallet(&data_dir, &password),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run_node(args: RunArgs) -> Result<()> {
    let config = NodeConfig::from_flags(
        args.data_dir,
        args.ip,
        args.port,
        &args.miner,
        &args.bootstrap_account,
        &args.bootstrap_ip,
        args.bootstrap_port,
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting opb node");
    let node = Node::new(config)?;

    let root = CancellationToken::new();
    let shutdown = root.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    node.run(root).await
}

fn list_balances(data_dir: &Path) -> Result<()> {
    let ledger = opb_state::Ledger::open(data_dir)?;

    println!("Account balances at block {}:", ledger.latest_hash());
    let mut balances: Vec<_> = ledger.balances().into_iter().collect();
    balances.sort_by_key(|(account, _)| *account);
    for (account, balance) in balances {
        println!("  {account}: {balance} {}", ledger.genesis().symbol);
    }
    Ok(())
}

fn new_wallet(data_dir: &Path, password: &str) -> Result<()> {
    let address = opb_wallet::create_account(data_dir, password)?;
    println!("New account created: {address}");
    println!("Keystore: {}", opb_wallet::keystore_dir(data_dir).display());
    Ok(())
}
