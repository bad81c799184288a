mod commands;
pub mod constants;
pub mod error;
pub mod models;
pub mod modules;
pub mod server;
pub mod transport;

use std::sync::Arc;
use tracing::{error, info, warn};

use modules::persistence::{CursorStore, IdentityStore, RecipientDb};
use modules::rotation::Rotator;
use modules::system::logger;
use transport::http::HttpBridgeTransport;
use transport::proxy_pool::ProxyPool;

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn apply_env_overrides(config: &mut crate::models::AppConfig) {
    if let Ok(interval) = std::env::var("RONDO_INTERVAL_SECS") {
        match interval.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => {
                info!("Using cycle interval from environment: {}s", secs);
                config.schedule.interval_secs = secs;
            }
            _ => warn!("Ignoring invalid RONDO_INTERVAL_SECS value: {}", interval),
        }
    }

    if let Ok(batch) = std::env::var("RONDO_BATCH_SIZE") {
        match batch.trim().parse::<usize>() {
            Ok(size) if size > 0 => {
                info!("Using batch size from environment: {}", size);
                config.dispatch.batch_size = size;
            }
            _ => warn!("Ignoring invalid RONDO_BATCH_SIZE value: {}", batch),
        }
    }

    if let Ok(run_on_start) = std::env::var("RONDO_RUN_ON_START") {
        if let Some(parsed) = parse_env_bool(&run_on_start) {
            config.schedule.run_on_start = parsed;
            info!("Using run_on_start from environment: {}", parsed);
        } else {
            warn!("Ignoring invalid RONDO_RUN_ON_START value: {}", run_on_start);
        }
    }

    if let Ok(url) = std::env::var("RONDO_GATEWAY_URL") {
        if !url.trim().is_empty() {
            info!("Using gateway URL from environment");
            config.transport.gateway_url = url;
        }
    }
}

async fn start_runtime() -> Result<(), String> {
    let mut config = modules::system::config::load_app_config()?;
    apply_env_overrides(&mut config);
    modules::system::validation::validate_app_config(&config).map_err(|errors| {
        format!(
            "configuration_validation_failed:\n{}",
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        )
    })?;

    let identities = IdentityStore::open_default()?;
    let recipients = RecipientDb::open_default()?;
    recipients
        .init()
        .map_err(|e| format!("failed_to_init_recipient_db: {}", e))?;
    let cursor_store = CursorStore::open_default()?;

    let message_templates = modules::templates::load_templates()?;
    if message_templates.is_empty() {
        return Err(format!(
            "no message templates configured; add at least one entry to {}",
            modules::templates::templates_path()?.display()
        ));
    }

    let proxy_pool = if config.proxy.enabled {
        let mut path = std::path::PathBuf::from(&config.proxy.path);
        if path.is_relative() {
            path = modules::persistence::data_dir()?.join(path);
        }
        let pool = ProxyPool::load(&path)?;
        if pool.is_empty() {
            warn!("Proxy list {} is empty; using direct egress", path.display());
        } else {
            info!("Loaded {} proxy endpoint(s) from {}", pool.len(), path.display());
        }
        pool
    } else {
        info!("Proxy pool disabled; using direct egress");
        ProxyPool::empty()
    };

    info!(
        "Starting rotation runtime ({} identities provisioned, {} active recipients)",
        identities
            .count()
            .map_err(|e| format!("failed_to_count_identities: {}", e))?,
        recipients
            .count_by_status(models::DeliveryStatus::Active)
            .map_err(|e| format!("failed_to_count_recipients: {}", e))?,
    );

    let transport = Arc::new(HttpBridgeTransport::new(config.transport.gateway_url.clone()));
    let rotator = Arc::new(Rotator::new(
        transport,
        proxy_pool,
        identities,
        recipients,
        cursor_store,
        message_templates,
        config.clone(),
    ));

    if config.server.enabled {
        server::start_status_server(rotator.clone(), config.server.port);
    }
    modules::system::scheduler::start_scheduler(rotator, config.schedule.clone());
    Ok(())
}

fn run_service() {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    runtime.block_on(async {
        if let Err(e) = start_runtime().await {
            error!("{}", e);
            std::process::exit(1);
        }

        info!("rondo is running. Press Ctrl+C to exit.");
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    });
}

fn print_usage() {
    eprintln!("Usage: rondo [run | seed-identities <file.json> | import-recipients <file>]");
}

pub fn run() {
    logger::init_logger();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        None | Some("run") => run_service(),
        Some("seed-identities") => match args.get(2) {
            Some(path) => match commands::seed_identities(path) {
                Ok(created) => info!("Seed complete: {} identity(ies) provisioned", created),
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(1);
                }
            },
            None => {
                print_usage();
                std::process::exit(2);
            }
        },
        Some("import-recipients") => match args.get(2) {
            Some(path) => match commands::import_recipients(path) {
                Ok(added) => info!("Import complete: {} new recipient(s)", added),
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(1);
                }
            },
            None => {
                print_usage();
                std::process::exit(2);
            }
        },
        Some(other) => {
            error!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }
}
