use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use coop_registry_core::domain::{Address, KeyHash, MemberStatus, Network, OutputRef, TxId};

#[derive(Debug, Parser)]
#[command(name = "coop-registry", version, about = "Register and manage cooperatives on Cardano")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for `COOP_REGISTRY_*` configuration.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, env = "COOP_REGISTRY_NETWORK")]
    pub network: Option<Network>,

    /// Blockfrost-compatible API base URL.
    #[arg(long, global = true, env = "COOP_REGISTRY_LEDGER_URL")]
    pub ledger_url: Option<String>,

    #[arg(long, global = true, env = "COOP_REGISTRY_PROJECT_ID", hide_env_values = true)]
    pub project_id: Option<String>,

    /// JSON-RPC endpoint forwarding CIP-30 calls to the wallet.
    #[arg(long, global = true, env = "COOP_REGISTRY_WALLET_BRIDGE_URL")]
    pub wallet_bridge: Option<String>,

    /// Validator deployment record (JSON).
    #[arg(long, global = true, env = "COOP_REGISTRY_DEPLOYMENT")]
    pub deployment: Option<PathBuf>,

    /// Confirmation wait bound in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a new cooperative; the founder becomes its only admin.
    CreateEntity {
        /// Founder address; defaults to the wallet's address.
        #[arg(long, value_parser = parse_address)]
        founder: Option<Address>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    AddMember {
        #[command(flatten)]
        target: ActionTarget,
        /// Member verification key hash (hex).
        #[arg(long)]
        key: KeyHash,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = StatusArg::Active)]
        status: StatusArg,
        #[command(flatten)]
        wait: WaitArgs,
    },
    SetMemberStatus {
        #[command(flatten)]
        target: ActionTarget,
        #[arg(long)]
        key: KeyHash,
        #[arg(long, value_enum)]
        status: StatusArg,
        #[command(flatten)]
        wait: WaitArgs,
    },
    AddAdmin {
        #[command(flatten)]
        target: ActionTarget,
        #[arg(long)]
        key: KeyHash,
        #[command(flatten)]
        wait: WaitArgs,
    },
    RemoveAdmin {
        #[command(flatten)]
        target: ActionTarget,
        #[arg(long)]
        key: KeyHash,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Print the registry datum held at an output.
    Show {
        /// Registry output as `<tx id>#<index>`.
        #[arg(long)]
        registry: OutputRef,
    },
    /// Wait for a submitted transaction to appear on chain.
    Await {
        #[arg(long)]
        tx: TxId,
    },
}

#[derive(Debug, Args)]
pub struct ActionTarget {
    /// Registry output as `<tx id>#<index>`.
    #[arg(long)]
    pub registry: OutputRef,
    /// Signing admin address; defaults to the wallet's address.
    #[arg(long, value_parser = parse_address)]
    pub signer: Option<Address>,
}

#[derive(Debug, Args)]
pub struct WaitArgs {
    /// Return right after submission instead of waiting for confirmation.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Active,
    Inactive,
    Suspended,
}

impl From<StatusArg> for MemberStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => MemberStatus::Active,
            StatusArg::Inactive => MemberStatus::Inactive,
            StatusArg::Suspended => MemberStatus::Suspended,
        }
    }
}

fn parse_address(raw: &str) -> Result<Address, String> {
    Address::from_bech32(raw).map_err(|e| e.to_string())
}
