//! # Ledger Report
//!
//! Opens a tenant, verifies its projection against the stored log and
//! prints the financial report.
//!
//! ## Usage
//! ```bash
//! # Configured tenant, today
//! cargo run -p biashara-ledger --bin ledger-report
//!
//! # Explicit config file and date
//! cargo run -p biashara-ledger --bin ledger-report -- --config ./ledger.toml --as-of 2026-06-30
//! ```
//!
//! Log verbosity comes from `RUST_LOG`, falling back to `[logging] filter`.

use chrono::{NaiveDate, Utc};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use biashara_ledger::{LedgerConfig, TenantLedger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut as_of: NaiveDate = Utc::now().date_naive();
    let mut tenant: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--as-of" | "-a" => {
                if i + 1 < args.len() {
                    as_of = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Biashara Ledger Report");
                println!();
                println!("Usage: ledger-report [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -t, --tenant <ID>     Tenant to open (overrides config)");
                println!("  -a, --as-of <DATE>    Report date, YYYY-MM-DD (default: today)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(tenant) = tenant {
        config.ledger.tenant_id = tenant;
    }
    // The report always checks the projection before printing it.
    config.ledger.verify_on_open = true;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ledger = TenantLedger::open_from_config(&config).await?;
    let report = ledger.report(as_of).await;

    println!("Tenant:   {}", ledger.tenant_id());
    println!("Database: {}", config.database.path.display());
    println!(
        "Events:   {}",
        ledger
            .last_event_id()
            .await
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!();
    print!("{}", report.render());

    Ok(())
}
