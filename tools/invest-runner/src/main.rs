use std::{fs, path::PathBuf, process::ExitCode};

use alloy_primitives::{Address, Bytes};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use invest_intent::{
    account::DelegationInspector,
    amount::format_units,
    intent::TokenRef,
    plan::{ConfigSigner, Frequency, LocalSigner, PlanController, PlanForm},
    reader::{CallMock, MockChainReader},
    run_task, Registry, Settler, TaskContext, TaskInputs, TaskResult,
};
use invest_intent_types::{ChainId, ChainReader};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

mod store;

use store::{write_json_atomic, FileScheduler};

/// Build Aave supply intents and manage recurring investment plans.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the invest task once and print its result.
    Run(RunArgs),
    /// Manage the signer's recurring plan.
    #[command(subcommand)]
    Plan(PlanCommand),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, env = "CHAIN_ID")]
    chain_id: u64,

    /// Token address, or a registry symbol such as USDC.
    #[arg(long, env = "TOKEN")]
    token: String,

    /// Amount to supply, in whole tokens (eg, 15.2).
    #[arg(long, env = "AMOUNT")]
    amount: String,

    /// Fee budget in the same token.
    #[arg(long, env = "MAX_FEE")]
    max_fee: String,

    #[arg(long, env = "USER_ADDRESS")]
    user: Address,

    #[arg(long, env = "SETTLER_ADDRESS")]
    settler: Address,

    /// JSON array of `{ request: { chainId, to, fnSelector }, response: { value, abiType } }`.
    #[arg(long)]
    calls: Option<PathBuf>,

    /// Decimals reported for `--token` when no call file covers it.
    #[arg(long)]
    decimals: Option<u8>,

    /// Path to write the task result JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
    /// Sign and store a new recurring plan.
    Activate(ActivateArgs),
    /// Cancel the signer's active plan.
    Deactivate(SignerArgs),
    /// Print the signer's active plan, if any.
    Show(SignerArgs),
}

#[derive(Args, Debug)]
struct SignerArgs {
    /// JSON file acting as the scheduling backend.
    #[arg(long, env = "PLAN_STORE", default_value = "plans.json")]
    store: PathBuf,

    /// Path to a file containing the signer private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
    private_key_path: Option<PathBuf>,

    /// Private key (hex string, 0x...).
    #[arg(long, env = "PKEY", conflicts_with = "private_key_path")]
    private_key: Option<String>,
}

#[derive(Args, Debug)]
struct ActivateArgs {
    #[command(flatten)]
    signer: SignerArgs,

    #[arg(long, default_value_t = ChainId::Base.id())]
    chain_id: u64,

    /// Registry symbol or address; defaults to the chain's first listed token.
    #[arg(long)]
    token: Option<String>,

    #[arg(long)]
    amount: String,

    #[arg(long)]
    max_fee: String,

    #[arg(long, default_value_t = Frequency::Daily)]
    frequency: Frequency,

    /// Code currently deployed at the signer's address (hex). Plans need an
    /// EIP-7702 delegation designator here.
    #[arg(long, default_value = "0x")]
    account_code: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = Registry::load().context("failed loading registry")?;

    match cli.command {
        Command::Run(args) => run(&registry, args).await,
        Command::Plan(PlanCommand::Activate(args)) => {
            activate_plan(&registry, args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan(PlanCommand::Deactivate(args)) => {
            deactivate_plan(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan(PlanCommand::Show(args)) => {
            show_plan(&registry, args).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(registry: &Registry, args: RunArgs) -> Result<ExitCode> {
    let reader = build_reader(&args)?;
    let inputs = TaskInputs {
        chain_id: args.chain_id,
        token: args.token.clone(),
        amount: args.amount.clone(),
        max_fee: args.max_fee.clone(),
    };
    let context = TaskContext::new(
        args.user,
        vec![Settler {
            address: args.settler,
            chain_id: args.chain_id,
        }],
        now_millis(),
    );

    let result = run_task(registry, &reader, &inputs, &context).await;
    if result.success {
        log_fees(registry, &reader, &result).await;
    }

    if let Some(ref path) = args.output {
        write_json_atomic(path, &result)?;
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("failed serialising task result")?
    );

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_reader(args: &RunArgs) -> Result<MockChainReader> {
    let mocks: Vec<CallMock> = match args.calls {
        Some(ref path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("failed parsing JSON in {}", path.display()))?
        }
        None => Vec::new(),
    };
    let mut reader = MockChainReader::new(mocks);

    if let Some(decimals) = args.decimals {
        let chain = ChainId::try_from(args.chain_id)?;
        let TokenRef::Address(token) = TokenRef::parse(&args.token) else {
            bail!("--decimals needs --token to be an address, got {:?}", args.token);
        };
        reader = reader.with_decimals(chain, token, decimals);
    }
    Ok(reader)
}

async fn log_fees(registry: &Registry, reader: &MockChainReader, result: &TaskResult) {
    for intent in &result.intents {
        for fee in &intent.max_fees {
            let decimals = match registry.find_token(intent.chain_id, fee.token) {
                Some(token) => Some(token.decimals),
                None => reader.decimals(intent.chain_id, fee.token).await.ok(),
            };
            if let Some(decimals) = decimals {
                tracing::info!(
                    chain = %intent.chain_id,
                    token = %fee.token,
                    max_fee = %format_units(fee.amount, decimals),
                    "fee budget"
                );
            }
        }
    }
}

fn now_millis() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

fn load_signer(args: &SignerArgs) -> Result<LocalSigner> {
    let key = if let Some(ref path) = args.private_key_path {
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?
    } else if let Some(ref key) = args.private_key {
        key.clone()
    } else {
        return Err(anyhow!(
            "missing signer key: provide --private-key-path or --private-key (or set PRIV_KEY_PATH/PKEY)"
        ));
    };
    LocalSigner::from_hex(&key).context("failed loading signer key")
}

async fn activate_plan(registry: &Registry, args: ActivateArgs) -> Result<()> {
    let signer = load_signer(&args.signer)?;
    let chain = ChainId::try_from(args.chain_id)?;

    let mut form = PlanForm::new(registry).ok_or_else(|| anyhow!("registry lists no default token"))?;
    if !form.select_chain(registry, chain) {
        bail!("no plan tokens listed for {chain}");
    }
    if let Some(ref token) = args.token {
        form.token = match TokenRef::parse(token) {
            TokenRef::Symbol(symbol) => registry.resolve_token(chain, symbol)?,
            TokenRef::Address(address) => registry
                .find_token(chain, address)
                .ok_or_else(|| anyhow!("{address} is not a plan token on {chain}"))?,
        };
    }
    form.amount = args.amount;
    form.max_fee = args.max_fee;
    form.frequency = args.frequency;

    let code = hex::decode(args.account_code.trim_start_matches("0x")).context("invalid --account-code")?;
    let inspector = DelegationInspector::new(MockChainReader::default().with_code(
        chain,
        signer.address(),
        Bytes::from(code),
    ));

    let mut controller = PlanController::new(FileScheduler::new(&args.signer.store), signer, inspector);
    controller.refresh().await?;
    let config = controller.activate(&form.params()).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("failed serialising plan")?
    );
    Ok(())
}

async fn deactivate_plan(args: SignerArgs) -> Result<()> {
    let signer = load_signer(&args)?;
    let inspector = DelegationInspector::new(MockChainReader::default());
    let mut controller = PlanController::new(FileScheduler::new(&args.store), signer, inspector);

    if controller.refresh().await?.is_none() {
        bail!("no active plan in {}", args.store.display());
    }
    controller.deactivate().await?;

    println!("Plan cancelled");
    Ok(())
}

async fn show_plan(registry: &Registry, args: SignerArgs) -> Result<()> {
    let signer = load_signer(&args)?;
    let inspector = DelegationInspector::new(MockChainReader::default());
    let mut controller = PlanController::new(FileScheduler::new(&args.store), signer, inspector);

    let Some(config) = controller.refresh().await? else {
        println!("No active plan");
        return Ok(());
    };

    let mut form = PlanForm::new(registry).ok_or_else(|| anyhow!("registry lists no default token"))?;
    form.apply_config(registry, &config);
    println!(
        "{} {} {} on {} (max fee {}), created at {}",
        form.frequency,
        form.amount,
        form.token.symbol.unwrap_or("tokens"),
        form.chain,
        form.max_fee,
        config.created_at
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("failed serialising plan")?
    );
    Ok(())
}
