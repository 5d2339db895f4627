//! FIN gateway CLI
//!
//! Assembles drafts from JSON, parses raw FIN files and runs a demo lifecycle.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use fin_engine::{
    mt::{ChargeBearer, CustomerTransfer, Money, Party},
    LifecycleEvent, MtPayload, SwiftHeader,
};
use fin_gateway::{logging, DraftRequest, GatewayConfig, GatewayError, GatewayService};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::info;

/// FIN gateway: SWIFT MT message assembly, lifecycle and parsing
#[derive(Parser, Debug)]
#[command(name = "fin-gateway", version, about)]
struct Cli {
    /// TOML configuration file (defaults to environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Assemble a draft given as JSON and print the FIN text
    Assemble {
        /// JSON file holding the draft
        file: PathBuf,
        /// Generate session, sequence and UETR as a release would
        #[arg(long)]
        release: bool,
    },
    /// Parse a raw FIN file and print the decoded record as JSON
    Parse {
        /// Raw message file
        file: PathBuf,
    },
    /// Run one MT103 through approval, release and network delivery
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GatewayConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => GatewayConfig::from_env()?,
    };
    logging::init_tracing(config.log_format);
    let service = GatewayService::new(&config)?;

    match cli.command {
        Commands::Assemble { file, release } => {
            let content = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let draft: DraftRequest = serde_json::from_str(&content).context("draft JSON")?;
            match service.assemble(&draft, release) {
                Ok(assembled) => {
                    for warning in &assembled.warnings {
                        eprintln!("warning: {}", warning);
                    }
                    println!("{}", assembled.fin_message);
                }
                Err(GatewayError::Validation(failure)) => {
                    println!("{}", serde_json::to_string_pretty(&failure)?);
                    anyhow::bail!("{} validation error(s)", failure.errors.len());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Parse { file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let incoming = service.ingest(raw, None);
            println!("{}", serde_json::to_string_pretty(&incoming)?);
        }
        Commands::Demo => run_demo(&service).await?,
    }

    Ok(())
}

async fn run_demo(service: &GatewayService) -> anyhow::Result<()> {
    let draft = DraftRequest {
        transaction_reference_number: "DEMO0001".to_string(),
        related_reference: None,
        swift_header: SwiftHeader::to("COBADEFFXXX"),
        payload: MtPayload::CustomerTransfer(CustomerTransfer {
            bank_operation_code: Default::default(),
            value_date: Utc::now().date_naive(),
            settlement_amount: Money::new("EUR", Decimal::new(125_050, 2)),
            ordering_customer: Party::with_iban("GB29NWBK60161331926819", "JOHN DOE\n1 HIGH STREET\nLONDON"),
            ordering_institution: None,
            account_with_institution: None,
            beneficiary: Party::with_iban("DE89370400440532013000", "ACME GMBH\nFRANKFURT"),
            remittance_information: Some("INVOICE 2024-118".to_string()),
            details_of_charges: ChargeBearer::Sha,
            sender_to_receiver_information: None,
            stp: true,
        }),
    };

    let message = service.create_draft(draft, Some(1));
    let id = message.id;
    info!(id = %id, "Demo draft created");

    let preview = service.preview(id).await?;
    println!("--- preview ---\n{}\n", preview.fin_message);

    for (event, actor) in [
        (LifecycleEvent::Validate, 1),
        (LifecycleEvent::SubmitForApproval, 1),
        (LifecycleEvent::Approve { approver_id: 2 }, 2),
        (LifecycleEvent::Approve { approver_id: 3 }, 3),
        (LifecycleEvent::Release, 1),
    ] {
        let message = service.transition(id, event, Some(actor)).await?;
        println!("status: {}", message.message_status);
    }

    let delivered = service.deliver(id).await?;
    println!(
        "--- released ---\n{}\n",
        delivered.fin_message.as_deref().unwrap_or_default()
    );
    if let Some(report) = &delivered.network_report {
        println!("--- network report ---\n{}\n", report.raw_text);
    }

    let completed = service.transition(id, LifecycleEvent::Complete, Some(1)).await?;
    println!("--- audit ---");
    for entry in &completed.audit_log {
        println!(
            "{} {:<22} {:>4} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.event,
            entry.actor_id.map(|a| a.to_string()).unwrap_or_default(),
            entry.details
        );
    }

    let inbound = service.ingest(delivered.fin_message.unwrap_or_default(), None);
    println!(
        "\n--- inbound ---\nstatus {} ref {} checksum verified {}",
        inbound.status,
        inbound.ref20.unwrap_or_default(),
        inbound.checksum_verified
    );

    if let Some(metrics) = service.metrics() {
        println!("\n--- metrics ---\n{}", metrics.render());
    }
    Ok(())
}
