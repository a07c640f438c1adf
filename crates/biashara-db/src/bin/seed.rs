//! # Demo Tenant Seeder
//!
//! Populates the event store with a demo tenant for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default tenant into ./biashara_dev.db
//! cargo run -p biashara-db --bin seed
//!
//! # Specify database path and tenant
//! cargo run -p biashara-db --bin seed -- --db ./data/biashara.db --tenant duka-la-mama
//! ```
//!
//! ## Generated History
//! Every entry goes through the core command handlers, so the seeded log is
//! exactly what the app would have written:
//! - Owner capital into the bank
//! - A small dry-goods catalogue with opening stock at the main store
//! - Part of the stock transferred to two shops
//! - Staff registered at headquarters and at each shop

use chrono::{NaiveDate, Utc};
use std::env;

use biashara_core::{
    handle, Command, CommandEnvelope, EmployeeId, EventLog, Location, Money, PaymentMethod,
    ProductId, ProjectedState, Rate, ShopId, DEFAULT_TENANT_ID,
};
use biashara_db::{Database, DbConfig, EventRepository};

/// Catalogue: (product id, name, selling price, cost price, opening quantity)
const CATALOGUE: &[(&str, &str, i64, i64, i64)] = &[
    ("mchele-1kg", "Mchele 1kg", 3_000, 2_200, 80),
    ("unga-2kg", "Unga wa Sembe 2kg", 4_500, 3_600, 120),
    ("sukari-1kg", "Sukari 1kg", 3_200, 2_700, 100),
    ("mafuta-1l", "Mafuta ya Kupikia 1L", 6_500, 5_200, 60),
    ("maharage-1kg", "Maharage 1kg", 4_000, 3_100, 70),
    ("chumvi-500g", "Chumvi 500g", 800, 500, 150),
    ("sabuni-bar", "Sabuni ya Kufulia", 1_500, 1_100, 90),
    ("chai-250g", "Majani ya Chai 250g", 3_800, 2_900, 40),
];

/// Shops that receive a share of the opening stock.
const SHOPS: &[&str] = &["kariakoo", "mwenge"];

/// Staff: (employee id, name, gross monthly salary, shop or None for HQ)
const STAFF: &[(&str, &str, i64, Option<&str>)] = &[
    ("emp-001", "Asha Mwakyusa", 1_200_000, None),
    ("emp-002", "Juma Hamisi", 650_000, Some("kariakoo")),
    ("emp-003", "Neema Mushi", 600_000, Some("mwenge")),
];

/// Standard VAT rate in basis points.
const VAT_BPS: u32 = 1800;

/// Appends one command's events: handle → stamp → persist → apply.
async fn run(
    repo: &EventRepository,
    tenant: &str,
    log: &mut EventLog,
    state: &mut ProjectedState,
    envelope: CommandEnvelope,
) -> Result<usize, Box<dyn std::error::Error>> {
    let drafts = handle(&envelope, state)?;
    let events = log.stamp(drafts, Utc::now())?;
    repo.append_events(tenant, &events).await?;
    for event in &events {
        state.apply(event)?;
    }
    let count = events.len();
    log.extend(events)?;
    Ok(count)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./biashara_dev.db");
    let mut tenant = String::from(DEFAULT_TENANT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Biashara Demo Tenant Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./biashara_dev.db)");
                println!("  -t, --tenant <ID>    Tenant id (default: {})", DEFAULT_TENANT_ID);
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Biashara Demo Tenant Seeder");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let repo = db.events();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Never append onto an existing history.
    if let Some(last) = repo.last_sequence(&tenant).await? {
        println!("⚠ Tenant already has {} events", last);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Use another --tenant or delete the database file.");
        return Ok(());
    }

    let opening = NaiveDate::from_ymd_opt(2026, 1, 2).ok_or("invalid opening date")?;
    let mut log = EventLog::new();
    let mut state = ProjectedState::new();
    let start = std::time::Instant::now();

    println!();
    println!("Recording opening capital...");
    run(
        &repo,
        &tenant,
        &mut log,
        &mut state,
        CommandEnvelope::new(
            opening,
            Command::ContributeCapital {
                contributor: "Owner".to_string(),
                amount: Money::from_major(5_000_000),
                method: PaymentMethod::Bank,
            },
        ),
    )
    .await?;

    println!("Listing catalogue and opening stock...");
    for (id, name, selling, cost, quantity) in CATALOGUE {
        let product_id = ProductId::new(*id);
        run(
            &repo,
            &tenant,
            &mut log,
            &mut state,
            CommandEnvelope::new(
                opening,
                Command::ListProduct {
                    product_id: product_id.clone(),
                    name: name.to_string(),
                    selling_price: Money::from_major(*selling),
                    cost_price: Money::from_major(*cost),
                    vat_rate: Rate::from_bps(VAT_BPS),
                },
            ),
        )
        .await?;
        run(
            &repo,
            &tenant,
            &mut log,
            &mut state,
            CommandEnvelope::new(
                opening,
                Command::ReceiveStock {
                    product_id: product_id.clone(),
                    quantity: *quantity,
                    unit_cost: Money::from_major(*cost),
                    supplier: "Opening balance".to_string(),
                    method: PaymentMethod::Bank,
                },
            ),
        )
        .await?;

        // A quarter of the opening stock goes to each shop.
        for shop in SHOPS {
            run(
                &repo,
                &tenant,
                &mut log,
                &mut state,
                CommandEnvelope::new(
                    opening,
                    Command::TransferStock {
                        product_id: product_id.clone(),
                        from: Location::Main,
                        to: Location::Shop(ShopId::new(*shop)),
                        quantity: quantity / 4,
                    },
                ),
            )
            .await?;
        }
        println!("  ✓ {}", name);
    }

    println!("Registering staff...");
    for (id, name, salary, shop) in STAFF {
        let mut envelope = CommandEnvelope::new(
            opening,
            Command::RegisterEmployee {
                employee_id: EmployeeId::new(*id),
                name: name.to_string(),
                gross_salary: Money::from_major(*salary),
            },
        );
        if let Some(shop) = shop {
            envelope = envelope.at_shop(ShopId::new(*shop));
        }
        run(&repo, &tenant, &mut log, &mut state, envelope).await?;
        println!("  ✓ {}", name);
    }

    let elapsed = start.elapsed();
    let views = state.views();
    println!();
    println!("✓ Wrote {} events in {:?}", log.len(), elapsed);
    println!("  Bank balance:  {}", views.headquarters.bank);
    println!("  Products:      {}", views.products.len());
    println!("  Employees:     {}", views.employees.len());

    if let Some(tail) = db.tails().await?.into_iter().find(|t| t.tenant_id == tenant) {
        if !tail.is_gapless() {
            return Err(format!(
                "tenant {} has {} rows but ends at sequence {}",
                tenant, tail.event_count, tail.last_sequence
            )
            .into());
        }
        println!("  Log tail:      #{}", tail.last_sequence);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
