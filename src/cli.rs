//! CLI interface for waybill.
//!
//! The command line is the request gateway in front of the lifecycle service:
//! it resolves who is calling, parses arguments into domain requests, and
//! prints results. Each subcommand is non-interactive: arguments in,
//! structured output out.
//!
//! Shipment references take a full UUID or an unambiguous prefix of one of
//! the caller's own shipments.

mod format;
mod shipment;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::identity::resolve_identity;
use crate::lifecycle::{ShipmentError, ShipmentService};
use crate::storage::Storage;

pub use shipment::ShipmentCommand;

/// Waybill — ship things, track them.
#[derive(Debug, Parser)]
#[command(name = "waybill", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Act as this identity instead of `WAYBILL_IDENTITY` or the config default.
    #[arg(long = "as", global = true)]
    identity: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: sending a parcel
  1. waybill --as alice shipment new --description "Fragile glassware" \
       --weight-kg 4 --volume-m3 0.05 \
       --pickup-lat 52.52 --pickup-lng 13.40 --pickup-address "Alexanderplatz 1, Berlin" \
       --accept-policy
     → prints a shipment ID (e.g. 3f2a9c10-...)
  2. waybill --as alice shipment deliver-to 3f2 --lat 48.13 --lng 11.57 --address "Marienplatz 1, Munich"
  3. waybill --as alice shipment status 3f2 accepted
  4. waybill --as alice shipment list --status accepted"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create, inspect, and move shipments.
    Shipment {
        #[command(subcommand)]
        command: ShipmentCommand,
    },
}

/// Errors returned to `main`, split by who can fix them.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Shipment(#[from] ShipmentError),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code: 2 for caller mistakes, 1 for server-side failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Shipment(e) if e.is_client_error() => 2,
            Self::Shipment(_) | Self::Output(_) => 1,
        }
    }
}

/// Run the CLI.
pub fn run(config: &Config, storage: &Storage) -> Result<(), CliError> {
    let cli = Cli::parse();
    let requester = resolve_identity(cli.identity.as_deref(), config).map_err(CliError::Usage)?;
    let policy = config.denylist();
    tracing::debug!(
        %requester,
        transitions = %config.transitions,
        denylist = policy.keywords().len(),
        "resolved caller"
    );

    let service = ShipmentService::new(storage, policy, config.transitions);

    match cli.command {
        Command::Shipment { command } => shipment::run(&service, &requester, command),
    }
}
