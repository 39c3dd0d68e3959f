//! Shipment commands: new, list, show, status, assign-trip, deliver-to.

use clap::{Subcommand, ValueEnum};
use uuid::Uuid;

use crate::lifecycle::ShipmentService;
use crate::model::{Location, NewShipment, Shipment, ShipmentStatus};
use crate::policy::ContentPolicy;
use crate::storage::RecordStore;

use super::CliError;
use super::format::{format_shipment_line, short_id};

/// Shortest prefix accepted as a shipment reference.
const MIN_PREFIX_LEN: usize = 3;

#[derive(Debug, Subcommand)]
pub enum ShipmentCommand {
    /// Create a new shipment owned by the caller. Prints the shipment ID.
    New {
        /// What is being shipped. Screened against the content policy.
        #[arg(long)]
        description: String,

        #[arg(long)]
        weight_kg: f64,

        #[arg(long)]
        volume_m3: f64,

        #[arg(long, allow_negative_numbers = true)]
        pickup_lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        pickup_lng: f64,

        #[arg(long)]
        pickup_address: String,

        /// Delivery point; all three delivery flags or none.
        #[arg(long, allow_negative_numbers = true)]
        delivery_lat: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        delivery_lng: Option<f64>,

        #[arg(long)]
        delivery_address: Option<String>,

        /// Photo URI. Can be specified multiple times; order is kept.
        #[arg(long = "photo")]
        photos: Vec<String>,

        /// Confirm the shipment complies with the content policy.
        #[arg(long)]
        accept_policy: bool,
    },

    /// List the caller's shipments, oldest first.
    List {
        /// Only shipments in this status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Print one shipment as JSON.
    Show {
        /// Shipment ID: full UUID or unambiguous prefix.
        shipment: String,
    },

    /// Move a shipment to a new status.
    Status {
        /// Shipment ID: full UUID or unambiguous prefix.
        shipment: String,

        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Record the trip carrying a shipment.
    AssignTrip {
        /// Shipment ID: full UUID or unambiguous prefix.
        shipment: String,

        /// Trip UUID.
        trip: Uuid,
    },

    /// Set or replace the delivery location.
    DeliverTo {
        /// Shipment ID: full UUID or unambiguous prefix.
        shipment: String,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        #[arg(long)]
        address: String,
    },
}

/// CLI-facing status, mapped to the domain `ShipmentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Created,
    Accepted,
    InTransit,
    Delivered,
    Cancelled,
}

impl StatusArg {
    fn to_domain(self) -> ShipmentStatus {
        match self {
            Self::Created => ShipmentStatus::Created,
            Self::Accepted => ShipmentStatus::Accepted,
            Self::InTransit => ShipmentStatus::InTransit,
            Self::Delivered => ShipmentStatus::Delivered,
            Self::Cancelled => ShipmentStatus::Cancelled,
        }
    }
}

pub(super) fn run<S: RecordStore, P: ContentPolicy>(
    service: &ShipmentService<'_, S, P>,
    requester: &str,
    command: ShipmentCommand,
) -> Result<(), CliError> {
    match command {
        ShipmentCommand::New {
            description,
            weight_kg,
            volume_m3,
            pickup_lat,
            pickup_lng,
            pickup_address,
            delivery_lat,
            delivery_lng,
            delivery_address,
            photos,
            accept_policy,
        } => {
            let delivery = match (delivery_lat, delivery_lng, delivery_address) {
                (Some(lat), Some(lng), Some(address)) => Some(Location { lat, lng, address }),
                (None, None, None) => None,
                _ => {
                    return Err(CliError::Usage(
                        "--delivery-lat, --delivery-lng, and --delivery-address go together"
                            .to_string(),
                    ));
                }
            };
            let request = NewShipment {
                description,
                weight_kg,
                volume_m3,
                pickup: Location {
                    lat: pickup_lat,
                    lng: pickup_lng,
                    address: pickup_address,
                },
                delivery,
                photos,
                policy_accepted: accept_policy,
            };
            cmd_new(service, requester, request)
        }
        ShipmentCommand::List { status } => {
            cmd_list(service, requester, status.map(StatusArg::to_domain))
        }
        ShipmentCommand::Show { shipment } => {
            let shipment = resolve_shipment(service, requester, &shipment)?;
            println!("{}", serde_json::to_string_pretty(&shipment)?);
            Ok(())
        }
        ShipmentCommand::Status { shipment, status } => {
            let shipment = resolve_shipment(service, requester, &shipment)?;
            cmd_status(service, &shipment, status.to_domain())
        }
        ShipmentCommand::AssignTrip { shipment, trip } => {
            let shipment = resolve_shipment(service, requester, &shipment)?;
            service.assign_trip(shipment.id, trip)?;
            eprintln!("Shipment {} assigned to trip {}", short_id(shipment.id), short_id(trip));
            Ok(())
        }
        ShipmentCommand::DeliverTo {
            shipment,
            lat,
            lng,
            address,
        } => {
            let shipment = resolve_shipment(service, requester, &shipment)?;
            let updated = service.set_delivery(shipment.id, Location { lat, lng, address })?;
            if let Some(delivery) = &updated.delivery {
                eprintln!("Shipment {} delivers to {}", short_id(updated.id), delivery.address);
            }
            Ok(())
        }
    }
}

fn cmd_new<S: RecordStore, P: ContentPolicy>(
    service: &ShipmentService<'_, S, P>,
    requester: &str,
    request: NewShipment,
) -> Result<(), CliError> {
    let shipment = service.create(request, requester)?;
    println!("{}", shipment.id);
    Ok(())
}

fn cmd_list<S: RecordStore, P: ContentPolicy>(
    service: &ShipmentService<'_, S, P>,
    requester: &str,
    status: Option<ShipmentStatus>,
) -> Result<(), CliError> {
    let shipments = service.list_for_requester(requester, status)?;

    if shipments.is_empty() {
        println!("No shipments");
        return Ok(());
    }

    for s in &shipments {
        println!("{}", format_shipment_line(s));
    }

    Ok(())
}

fn cmd_status<S: RecordStore, P: ContentPolicy>(
    service: &ShipmentService<'_, S, P>,
    shipment: &Shipment,
    status: ShipmentStatus,
) -> Result<(), CliError> {
    let updated = service.update_status(shipment.id, status)?;
    eprintln!(
        "Shipment {}: {} → {}",
        short_id(updated.id),
        shipment.status,
        updated.status
    );
    Ok(())
}

/// Resolve a shipment reference (full UUID or unambiguous prefix) among the
/// requester's shipments.
fn resolve_shipment<S: RecordStore, P: ContentPolicy>(
    service: &ShipmentService<'_, S, P>,
    requester: &str,
    reference: &str,
) -> Result<Shipment, CliError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(CliError::Usage("shipment reference is empty".to_string()));
    }

    // Try full UUID first.
    if let Ok(id) = reference.parse::<Uuid>() {
        return Ok(service.get_by_id(id, requester)?);
    }

    if reference.len() < MIN_PREFIX_LEN {
        return Err(CliError::Usage(format!(
            "shipment reference '{reference}' is too short (need at least {MIN_PREFIX_LEN} characters)"
        )));
    }

    // Try as a prefix match against the requester's shipments.
    let shipments = service.list_for_requester(requester, None)?;
    let reference = reference.to_ascii_lowercase();
    let mut matches: Vec<Shipment> = shipments
        .into_iter()
        .filter(|s| s.id.to_string().starts_with(&reference))
        .collect();

    match matches.len() {
        0 => Err(CliError::Usage(format!("no shipment matching '{reference}'"))),
        1 => Ok(matches.remove(0)),
        n => {
            let ids: Vec<String> = matches.iter().map(|s| short_id(s.id)).collect();
            Err(CliError::Usage(format!(
                "'{reference}' is ambiguous, matches {n} shipments: {}",
                ids.join(", ")
            )))
        }
    }
}
