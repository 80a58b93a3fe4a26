//! Book of Scams CLI: contribute SOL to a scammer listing's bounty.

mod keys;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use bos_bounty::{
    BountyConfig, CancelHandle, ConfirmationWatcher, ContributionFlow, ContributionResult,
    FailureClass, FileJournal, FlowError, FlowSettings, Journal, JournalStage,
};
use bos_crypto::generate_keypair;
use bos_rpc::{ChainClient, RpcClient};
use bos_store::BountyStore;
use bos_store_rest::RestStore;
use bos_transactions::ContributionRequest;
use bos_types::{ChainAddress, Cluster, RecordId, Signature, Timestamp};
use bos_utils::{format_duration, init_logging, LogFormat};
use bos_wallet_core::{encrypt_keypair, KeypairWallet, TransferPrompt, WalletProvider, WalletSession};
use clap::Parser;

use crate::keys::KeySource;

#[derive(Parser)]
#[command(name = "book-of-scams", about = "Fund bounties on Book of Scams listings")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "BOS_CONFIG")]
    config: Option<PathBuf>,

    /// Cluster: "mainnet", "devnet", "testnet" or "localnet".
    #[arg(long, env = "BOS_CLUSTER")]
    cluster: Option<Cluster>,

    /// JSON-RPC endpoint (defaults to the cluster's public endpoint).
    #[arg(long, env = "BOS_RPC_URL")]
    rpc_url: Option<String>,

    /// Base URL of the bounty store.
    #[arg(long, env = "BOS_STORE_URL")]
    store_url: Option<String>,

    #[arg(long, env = "BOS_JOURNAL")]
    journal: Option<PathBuf>,

    #[arg(long, env = "BOS_KEYSTORE")]
    keystore: Option<PathBuf>,

    /// Unencrypted Solana CLI key file to sign with instead of the keystore.
    #[arg(long, env = "BOS_SOLANA_KEYPAIR")]
    keypair: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BOS_LOG_LEVEL")]
    log_level: Option<String>,

    /// "human" or "json".
    #[arg(long, env = "BOS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create a new encrypted keystore.
    Keygen {
        /// Overwrite an existing keystore.
        #[arg(long)]
        force: bool,
    },
    /// Print the signing address.
    Address,
    /// Print the SOL balance of an address (default: the signing address).
    Balance { address: Option<ChainAddress> },
    /// Send SOL to a listing's bounty wallet and credit the bounty.
    Contribute(ContributeArgs),
    /// Check a submitted contribution and credit it if it has confirmed.
    Status {
        signature: Signature,
        /// Keep polling until the confirmation timeout.
        #[arg(long)]
        wait: bool,
    },
    /// List contributions that are submitted but not settled.
    Pending,
    /// Stop tracking a pending contribution.
    Abandon { signature: Signature },
}

#[derive(clap::Args)]
struct ContributeArgs {
    /// Listing id.
    record: String,
    /// Amount in SOL, e.g. "2.5".
    amount: String,
    /// Recipient wallet. Defaults to the listing's bounty wallet.
    #[arg(long)]
    recipient: Option<String>,
    /// Optional note stored with the contribution.
    #[arg(long)]
    message: Option<String>,
    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level).context("failed to install logger")?;
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    let signer = KeySource::new(&config.keystore_path, cli.keypair.as_deref());
    match cli.command {
        Command::Keygen { force } => keygen(&config.keystore_path, force),
        Command::Address => {
            println!("{}", signer.address()?);
            Ok(())
        }
        Command::Balance { address } => {
            let address = match address {
                Some(address) => address,
                None => signer.address()?,
            };
            balance(&config, &address).await
        }
        Command::Contribute(args) => contribute(&config, signer, args).await,
        Command::Status { signature, wait } => status(&config, &signature, wait).await,
        Command::Pending => pending(&config),
        Command::Abandon { signature } => abandon(&config, &signature),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BountyConfig> {
    let mut config = match &cli.config {
        Some(path) => BountyConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BountyConfig::default(),
    };

    if let Some(cluster) = cli.cluster {
        config.cluster = cluster;
    }
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = Some(url.clone());
    }
    if let Some(url) = &cli.store_url {
        config.store_url = Some(url.clone());
    }
    if let Some(path) = &cli.journal {
        config.journal_path = path.clone();
    }
    if let Some(path) = &cli.keystore {
        config.keystore_path = path.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    config.validate()?;
    Ok(config)
}

fn keygen(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    let password = keys::new_password()?;
    let keypair = generate_keypair();
    let keystore = encrypt_keypair(&keypair, &password)?;
    keys::write_keystore(&keystore, path)?;
    tracing::info!(address = %keypair.address, path = %path.display(), "keystore created");
    println!("{}", keypair.address);
    Ok(())
}

async fn balance(config: &BountyConfig, address: &ChainAddress) -> anyhow::Result<()> {
    let chain = rpc_client(config)?;
    let lamports = chain
        .get_balance(address)
        .await
        .with_context(|| format!("failed to read balance from {}", config.resolved_rpc_url()))?;
    println!("{} SOL", lamports.to_sol());
    Ok(())
}

async fn contribute(
    config: &BountyConfig,
    signer: KeySource<'_>,
    args: ContributeArgs,
) -> anyhow::Result<()> {
    let chain = rpc_client(config)?;
    let store = open_store(config)?;

    let recipient = match args.recipient {
        Some(recipient) => recipient,
        None => {
            let id = RecordId::new(args.record.as_str())?;
            let record = store
                .get_record(&id)
                .await?
                .with_context(|| format!("record {id} not found"))?;
            record
                .bounty_address
                .with_context(|| format!("record {id} has no bounty wallet; pass --recipient"))?
                .to_string()
        }
    };
    let request =
        ContributionRequest::parse(&args.record, &recipient, &args.amount, args.message.as_deref())?;

    let skip_prompt = args.yes;
    let gate = ApprovalGate::default();
    let approval = gate.clone();
    let wallet = KeypairWallet::new(signer.load()?, chain.clone())
        .with_approval(move |prompt| approval.record(skip_prompt || confirm_transfer(prompt)));
    let session = WalletSession::new(Some(Arc::new(wallet) as Arc<dyn WalletProvider>));
    let flow = open_flow(config, session, chain, store)?;

    let cancel = cancel_on_ctrl_c(gate);
    let started = Instant::now();
    let result = flow.contribute_with_cancel(request, &cancel).await;
    report(result, started)
}

async fn status(config: &BountyConfig, signature: &Signature, wait: bool) -> anyhow::Result<()> {
    let chain = rpc_client(config)?;
    let flow = open_flow(config, WalletSession::new(None), chain.clone(), open_store(config)?)?;

    let started = Instant::now();
    let result = if wait {
        let cancel = cancel_on_ctrl_c(ApprovalGate::approved());
        flow.resume_and_wait(signature, &cancel).await
    } else {
        flow.resume(signature).await
    };

    match result {
        Err(FlowError::UnknownSignature(_)) => {
            // Not submitted from here; report what the chain says and stop.
            let watcher = ConfirmationWatcher::new(chain, config.commitment, config.poll_interval());
            match watcher.check(signature).await? {
                Some(outcome) => println!("{signature}: {outcome} (not a tracked contribution)"),
                None => println!(
                    "{signature}: not found at {} commitment",
                    config.commitment.as_str()
                ),
            }
            Ok(())
        }
        other => report(other, started),
    }
}

fn pending(config: &BountyConfig) -> anyhow::Result<()> {
    let journal = open_journal(config)?;
    let entries = journal.open_entries()?;
    if entries.is_empty() {
        println!("no pending contributions");
        return Ok(());
    }

    let now = Timestamp::now();
    for entry in entries {
        let age = Duration::from_secs(entry.submitted_at.elapsed_since(now));
        let stage = match entry.stage {
            JournalStage::TotalApplied => "credited, history missing",
            _ => "awaiting confirmation",
        };
        println!(
            "{}  {} SOL -> {}  {}  ({} ago)",
            entry.signature,
            entry.request.amount(),
            entry.request.target_record_id(),
            stage,
            format_duration(age)
        );
    }
    Ok(())
}

fn abandon(config: &BountyConfig, signature: &Signature) -> anyhow::Result<()> {
    let flow = open_flow(config, WalletSession::new(None), rpc_client(config)?, open_store(config)?)?;
    match flow.abandon(signature) {
        Ok(()) => {
            println!("stopped tracking {signature}");
            println!("if it lands later, credit it with: book-of-scams status {signature}");
            Ok(())
        }
        Err(FlowError::UnknownSignature(_)) => bail!("{signature} is not a tracked contribution"),
        Err(FlowError::NotAwaiting(_)) => {
            bail!("{signature} is no longer awaiting confirmation; see `book-of-scams status {signature}`")
        }
        Err(e) => Err(e.into()),
    }
}

// ── Wiring ─────────────────────────────────────────────────────────────

fn rpc_client(config: &BountyConfig) -> anyhow::Result<Arc<dyn ChainClient>> {
    let client = RpcClient::new(config.resolved_rpc_url(), config.commitment)?;
    Ok(Arc::new(client))
}

fn open_store(config: &BountyConfig) -> anyhow::Result<Arc<dyn BountyStore>> {
    let url = config
        .store_url
        .as_deref()
        .context("no bounty store configured; set store_url or BOS_STORE_URL")?;
    let api_key = std::env::var(&config.store_api_key_env).ok();
    Ok(Arc::new(RestStore::new(url, api_key)?))
}

fn open_journal(config: &BountyConfig) -> anyhow::Result<FileJournal> {
    FileJournal::open(config.journal_path.clone())
        .with_context(|| format!("failed to open journal {}", config.journal_path.display()))
}

fn open_flow(
    config: &BountyConfig,
    session: WalletSession,
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn BountyStore>,
) -> anyhow::Result<ContributionFlow> {
    let journal = Arc::new(open_journal(config)?);
    Ok(ContributionFlow::new(
        session,
        chain,
        store,
        journal,
        FlowSettings::from_config(config),
    ))
}

/// Whether the user has approved the transfer yet.
#[derive(Clone, Default)]
struct ApprovalGate(Arc<AtomicBool>);

impl ApprovalGate {
    fn approved() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Pass `approved` through, remembering a yes.
    fn record(&self, approved: bool) -> bool {
        if approved {
            self.0.store(true, Ordering::Release);
        }
        approved
    }

    fn on_interrupt(&self) -> Interrupt {
        if self.0.load(Ordering::Acquire) {
            Interrupt::CancelWait
        } else {
            Interrupt::Exit
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Interrupt {
    /// Nothing has been signed; stop right away.
    Exit,
    /// A transfer may be out; stop waiting but keep it tracked.
    CancelWait,
}

/// Ctrl-C before approval exits, which also covers a blocked approval prompt.
/// After approval it cancels the returned handle. Only the wait is cut short;
/// a sent transfer stays sent.
fn cancel_on_ctrl_c(gate: ApprovalGate) -> CancelHandle {
    let cancel = CancelHandle::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        match gate.on_interrupt() {
            Interrupt::Exit => {
                eprintln!();
                eprintln!("cancelled; nothing was sent");
                std::process::exit(130);
            }
            Interrupt::CancelWait => handle.cancel(),
        }
    });
    cancel
}

fn confirm_transfer(prompt: &TransferPrompt) -> bool {
    eprint!(
        "Send {} SOL ({}) from {} to {}? [y/N] ",
        prompt.amount, prompt.lamports, prompt.from, prompt.to
    );
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn report(result: Result<ContributionResult, FlowError>, started: Instant) -> anyhow::Result<()> {
    let elapsed = format_duration(started.elapsed());
    match result {
        Ok(ContributionResult::Credited { signature, total }) => {
            println!("confirmed after {elapsed}: {signature}");
            println!(
                "bounty for {} is now {} SOL",
                total.target_record_id, total.total_amount
            );
            Ok(())
        }
        Ok(ContributionResult::AlreadyCredited { signature }) => {
            println!("{signature} is already credited");
            Ok(())
        }
        Ok(ContributionResult::Pending { signature }) => {
            println!("submitted {signature}; not confirmed after {elapsed}");
            println!("check again with: book-of-scams status {signature}");
            Ok(())
        }
        Ok(ContributionResult::Failed { signature, reason }) => {
            bail!("transaction {signature} failed: {reason}")
        }
        Err(e) if e.is_user_cancellation() => {
            println!("cancelled; nothing was sent");
            Ok(())
        }
        Err(e) => {
            let hint = failure_hint(e.class());
            Err(anyhow::Error::new(e).context(hint))
        }
    }
}

fn failure_hint(class: FailureClass) -> &'static str {
    match class {
        FailureClass::NothingHappened => "contribution failed; no funds were moved",
        FailureClass::TransferUncertain => {
            "the transfer may have been sent; run `book-of-scams pending` before retrying"
        }
        FailureClass::TransferCompleted => {
            "the transfer went through but the bounty is not fully recorded; \
             run `book-of-scams status <signature>` to finish"
        }
    }
}
