//! # edi-cli
//!
//! Command-line front end for the X12 load-tender fan-out router.
//!
//! `route` runs one inbound interchange through agreement resolution and
//! per-shipment fan-out, `decompose` shows what the router would see, and
//! `agreements` inspects an agreement file.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use edi_adapter_x12::X12Parser;
use edi_fanout::{
    AgreementCache, DirectoryScope, FanOutRouter, InboundMessage, MemoryTransport, OutboundUnit,
    RouterConfig, StaticDirectory, decompose,
};
use edi_ir::InterchangeHeader;
use edi_schema::{SchemaLoader, SchemaRegistry};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edi")]
#[command(about = "X12 load tender fan-out router")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Fan an interchange out into one unit per shipment
    Route {
        /// Input X12 file
        input: PathBuf,

        /// Inbound session id
        #[arg(short, long)]
        session: String,

        /// Agreement JSON file
        #[arg(short, long)]
        agreements: PathBuf,

        /// Write each unit's XML payload into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Inbound message id
        #[arg(long)]
        message_id: Option<String>,
    },

    /// Show the header identity and shipment ids of an interchange
    Decompose {
        /// Input X12 file
        input: PathBuf,
    },

    /// List agreements, or resolve the one matching an identity
    Agreements {
        /// Agreement JSON file
        #[arg(short, long)]
        agreements: PathBuf,

        #[arg(long)]
        sender_qualifier: Option<String>,

        #[arg(long)]
        sender_id: Option<String>,

        #[arg(long)]
        receiver_qualifier: Option<String>,

        #[arg(long)]
        receiver_id: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Route {
            input,
            session,
            agreements,
            output_dir,
            message_id,
        } => {
            route(
                &config,
                &input,
                session,
                &agreements,
                output_dir.as_deref(),
                message_id,
            )
            .await
        }
        Commands::Decompose { input } => decompose_file(&config, &input),
        Commands::Agreements {
            agreements,
            sender_qualifier,
            sender_id,
            receiver_qualifier,
            receiver_id,
        } => {
            let identity = match (sender_qualifier, sender_id, receiver_qualifier, receiver_id) {
                (Some(sq), Some(sid), Some(rq), Some(rid)) => Some(InterchangeHeader::new(sq, sid, rq, rid)),
                (None, None, None, None) => None,
                _ => bail!("an identity needs all of --sender-qualifier, --sender-id, --receiver-qualifier and --receiver-id"),
            };
            list_agreements(&config, &agreements, identity.as_ref()).await
        }
    }
}

fn parser(config: &RouterConfig) -> Result<X12Parser> {
    let mut registry = SchemaRegistry::with_builtins();
    if !config.schemas.is_empty() {
        let loaded = SchemaLoader::new(config.schemas.clone())
            .load_into(&mut registry)
            .context("loading schema overlays")?;
        info!(loaded, "schema overlays applied");
    }
    Ok(X12Parser::with_registry(registry))
}

fn cache(config: &RouterConfig, agreements: &Path) -> Result<Arc<AgreementCache>> {
    let directory = StaticDirectory::from_json_file(agreements)
        .with_context(|| format!("loading agreements {}", agreements.display()))?
        .with_page_size(config.page_size);

    let scope = config.directory.clone().unwrap_or_else(|| {
        let account = agreements
            .file_stem()
            .map_or_else(|| "agreements".to_string(), |s| s.to_string_lossy().into_owned());
        DirectoryScope::new("local", "local", account)
    });

    Ok(Arc::new(
        AgreementCache::new(Arc::new(directory), scope)
            .with_policy(config.refresh_policy())
            .with_max_pages(config.max_directory_pages),
    ))
}

async fn route(
    config: &RouterConfig,
    input: &Path,
    session: String,
    agreements: &Path,
    output_dir: Option<&Path>,
    message_id: Option<String>,
) -> Result<()> {
    let body = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let router = FanOutRouter::new(cache(config, agreements)?, Arc::new(config.locator()?)).with_parser(parser(config)?);

    let mut message = InboundMessage::new(body).with_session_id(session);
    message.message_id = message_id;

    let transport = MemoryTransport::new();
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            shutdown.cancel();
        }
    });

    let report = router
        .process(&message, &transport, &cancel)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {e}", e.kind()))?;

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for unit in &report.units {
            let path = dir.join(payload_file_name(unit));
            std::fs::write(&path, &unit.payload).with_context(|| format!("writing {}", path.display()))?;
        }
    }

    for unit in &report.units {
        let line = json!({
            "partition_key": unit.partition_key,
            "shipment_id": unit.shipment_id,
            "index": unit.index,
            "agreement": unit.agreement_name,
            "bytes": unit.payload.len(),
        });
        println!("{line}");
    }

    info!(
        session_id = %report.session_id,
        units = report.units.len(),
        stats = ?router.stats(),
        "route complete"
    );
    Ok(())
}

fn payload_file_name(unit: &OutboundUnit) -> String {
    let key: String = unit
        .partition_key
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{:03}-{key}.xml", unit.index)
}

fn decompose_file(config: &RouterConfig, input: &Path) -> Result<()> {
    let body = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let interchange = parser(config)?.parse(&body, input.display().to_string())?;
    let decomposition = decompose(&interchange).map_err(|e| anyhow::anyhow!("{}: {e}", e.kind()))?;

    let path = config.locator()?.default_path().clone();
    let shipments: Vec<_> = decomposition
        .shipments
        .iter()
        .map(|shipment| {
            json!({
                "index": shipment.index,
                "control_number": shipment.control_number(),
                "shipment_id": shipment.shipment_id(&path),
            })
        })
        .collect();

    let output = json!({
        "identity": decomposition.header.identity(),
        "control_number": decomposition.header.control_number,
        "prepared_at": decomposition.header.prepared_at(),
        "shipments": shipments,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn list_agreements(
    config: &RouterConfig,
    agreements: &Path,
    identity: Option<&InterchangeHeader>,
) -> Result<()> {
    let cache = cache(config, agreements)?;
    let cancel = CancellationToken::new();

    let output = match identity {
        Some(header) => {
            let agreement = cache
                .resolve(header, &cancel)
                .await
                .map_err(|e| anyhow::anyhow!("{}: {e}", e.kind()))?;
            serde_json::to_string_pretty(&agreement)?
        }
        None => serde_json::to_string_pretty(cache.agreements(&cancel).await?.as_slice())?,
    };
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_fanout::PartitionKey;

    #[test]
    fn test_payload_file_name_is_filesystem_safe() {
        let unit = OutboundUnit {
            partition_key: PartitionKey::new("sess/42", "SHP 100"),
            shipment_id: "SHP 100".to_string(),
            index: 7,
            agreement_name: "ACME-WIDGETCO-001".to_string(),
            payload: String::new(),
        };
        assert_eq!(payload_file_name(&unit), "007-sess_42+SHP_100.xml");
    }

    #[test]
    fn test_cli_parses_route() {
        let cli = Cli::try_parse_from([
            "edi",
            "-v",
            "route",
            "in.x12",
            "--session",
            "sess-42",
            "--agreements",
            "agreements.json",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Route { ref session, .. } if session == "sess-42"));
    }
}
