//! coop-registry: command-line client for the cooperative registry contract.

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use serde_json::json;

use coop_registry_adapters::{
    Cip30Adapter, DeploymentRecord, LedgerAdapter, RegistryConfig, SystemClockAdapter,
};
use coop_registry_core::domain::{
    Address, Member, SubmissionStatus, SubmittedTransaction, TimestampMs,
};
use coop_registry_core::{
    cancellation, CancelToken, ClockPort, CommandResult, ConfirmationOutcome, RegistryClient,
    RegistryCommand,
};

mod cli;

use cli::{ActionTarget, Cli, Command, GlobalArgs, WaitArgs};

type Client = RegistryClient<Cip30Adapter, LedgerAdapter, SystemClockAdapter>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.global)?;
    let client = connect(&config)?;

    let (cancel, token) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, abandoning confirmation wait");
            cancel.cancel();
        }
    });

    run(&client, &config, cli.command, token).await
}

fn load_config(args: &GlobalArgs) -> Result<RegistryConfig> {
    let mut config = RegistryConfig::from_env()?;
    if let Some(network) = args.network {
        config.network = network;
    }
    if let Some(url) = &args.ledger_url {
        config.ledger_base_url = Some(url.clone());
    }
    if let Some(id) = &args.project_id {
        config.ledger_project_id = Some(id.clone());
    }
    if let Some(url) = &args.wallet_bridge {
        config.wallet_bridge_url = Some(url.clone());
    }
    if let Some(path) = &args.deployment {
        config.deployment_path = Some(path.clone());
    }
    if let Some(secs) = args.timeout_secs {
        config.confirmation_timeout_ms = secs.saturating_mul(1_000);
    }
    Ok(config)
}

fn connect(config: &RegistryConfig) -> Result<Client> {
    let path = config
        .deployment_path
        .as_deref()
        .ok_or_else(|| eyre!("no deployment record; pass --deployment or set COOP_REGISTRY_DEPLOYMENT"))?;
    let record = DeploymentRecord::load(path)?;
    if record.network != config.network {
        return Err(eyre!(
            "deployment record targets {} but the client is configured for {}",
            record.network,
            config.network
        ));
    }
    let validator = record
        .to_validator_ref()
        .wrap_err_with(|| format!("invalid deployment record {}", path.display()))?;
    tracing::info!(
        network = %config.network,
        validator = %validator.script_hash,
        ledger = %config.ledger_url(),
        "registry client configured"
    );

    Ok(RegistryClient::new(
        Cip30Adapter::with_config(config),
        LedgerAdapter::with_config(config),
        SystemClockAdapter,
        validator,
    )
    .with_tracker_config(config.tracker_config()))
}

async fn run(
    client: &Client,
    config: &RegistryConfig,
    command: Command,
    token: CancelToken,
) -> Result<()> {
    let (command, wait) = match command {
        Command::Show { registry } => {
            let state = client.registry_state(registry).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(());
        }
        Command::Await { tx } => {
            let mut submission = SubmittedTransaction {
                id: tx,
                submitted_at: now()?,
                status: SubmissionStatus::Submitted,
            };
            let (outcome, _) = client
                .await_confirmation(&mut submission, config.confirmation_timeout(), token)
                .await?;
            print_outcome(&submission, &outcome);
            return unconfirmed(&submission, outcome, config);
        }
        Command::CreateEntity {
            founder,
            name,
            description,
            wait,
        } => {
            let founder = signer_or_wallet(client, founder).await?;
            (
                RegistryCommand::CreateEntity {
                    founder,
                    name,
                    description,
                },
                wait,
            )
        }
        Command::AddMember {
            target,
            key,
            name,
            status,
            wait,
        } => {
            let ActionTarget { registry, signer } = target;
            let member = Member {
                name,
                verification_key_hash: key,
                join_time: now()?,
                status: status.into(),
            };
            (
                RegistryCommand::AddMember {
                    signer: signer_or_wallet(client, signer).await?,
                    registry,
                    member,
                },
                wait,
            )
        }
        Command::SetMemberStatus {
            target,
            key,
            status,
            wait,
        } => (
            RegistryCommand::UpdateMemberStatus {
                signer: signer_or_wallet(client, target.signer).await?,
                registry: target.registry,
                key,
                status: status.into(),
            },
            wait,
        ),
        Command::AddAdmin { target, key, wait } => (
            RegistryCommand::AddAdmin {
                signer: signer_or_wallet(client, target.signer).await?,
                registry: target.registry,
                key,
            },
            wait,
        ),
        Command::RemoveAdmin { target, key, wait } => (
            RegistryCommand::RemoveAdmin {
                signer: signer_or_wallet(client, target.signer).await?,
                registry: target.registry,
                key,
            },
            wait,
        ),
    };

    execute(client, config, command, wait, token).await
}

async fn execute(
    client: &Client,
    config: &RegistryConfig,
    command: RegistryCommand,
    wait: WaitArgs,
    token: CancelToken,
) -> Result<()> {
    let mut result: CommandResult = client.handle(command).await?;
    print_submission(&result);
    if wait.no_wait {
        return Ok(());
    }
    let (outcome, _) = client
        .await_confirmation(&mut result.submission, config.confirmation_timeout(), token)
        .await?;
    print_outcome(&result.submission, &outcome);
    unconfirmed(&result.submission, outcome, config)
}

/// Turns a wait that ended without confirmation into a failing exit.
fn unconfirmed(
    submission: &SubmittedTransaction,
    outcome: ConfirmationOutcome,
    config: &RegistryConfig,
) -> Result<()> {
    match outcome {
        ConfirmationOutcome::Confirmed { .. } => Ok(()),
        ConfirmationOutcome::TimedOut => Err(eyre!(
            "transaction {} not observed within {:?}; check the ledger before retrying",
            submission.id,
            config.confirmation_timeout()
        )),
        ConfirmationOutcome::Cancelled => Err(eyre!(
            "wait for transaction {} was interrupted; it may still land",
            submission.id
        )),
    }
}

async fn signer_or_wallet(client: &Client, explicit: Option<Address>) -> Result<Address> {
    match explicit {
        Some(address) => Ok(address),
        None => Ok(client.capability().get_address().await?),
    }
}

fn now() -> Result<TimestampMs> {
    SystemClockAdapter
        .now_ms()
        .map(TimestampMs)
        .map_err(|e| eyre!("clock unavailable: {e}"))
}

fn print_submission(result: &CommandResult) {
    println!(
        "{}",
        json!({
            "submission": result.submission,
            "registry": result.registry.to_string(),
            "members": result.state.members.len(),
            "admins": result.state.admins.len(),
        })
    );
}

fn print_outcome(submission: &SubmittedTransaction, outcome: &ConfirmationOutcome) {
    let summary = match outcome {
        ConfirmationOutcome::Confirmed { block_height } => {
            json!({ "outcome": "confirmed", "blockHeight": block_height })
        }
        ConfirmationOutcome::TimedOut => json!({ "outcome": "timedOut" }),
        ConfirmationOutcome::Cancelled => json!({ "outcome": "cancelled" }),
    };
    println!("{}", json!({ "txId": submission.id, "status": submission.status, "result": summary }));
}
