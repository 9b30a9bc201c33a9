//! # Seed Data Generator
//!
//! Fills the snapshot slot with a demo catalog and opening stock.
//!
//! ## Usage
//! ```bash
//! # Seed the default slot (./stockbook_dev.snapshot)
//! cargo run -p stock-db --bin seed
//!
//! # Seed a specific slot file
//! cargo run -p stock-db --bin seed -- --slot ./data/stockbook.snapshot
//! ```
//!
//! The slot must already hold an administrator (start the CLI once against
//! it). Products and movements are attributed to that account.
//!
//! ## Generated Data
//! - One product per catalog line below, code `{PREFIX}-{NN}`
//! - An initial stock of 0 and one ENTREE movement per product, dated today

use chrono::Utc;
use std::env;
use stock_core::{MovementKind, NewMovement, ProductInput, Role};
use stock_db::{Database, DbConfig, SnapshotSlot};

/// (code prefix, category, [(name, unit price, opening quantity)])
const CATALOG: &[(&str, &str, &[(&str, i64, i64)])] = &[
    (
        "ALI",
        "Alimentation",
        &[
            ("Riz parfumé 25kg", 17_500, 40),
            ("Huile végétale 5L", 6_000, 30),
            ("Sucre en poudre 1kg", 800, 120),
            ("Lait en poudre 400g", 2_300, 60),
            ("Farine de blé 50kg", 21_000, 12),
            ("Pâtes alimentaires 500g", 450, 200),
        ],
    ),
    (
        "BOI",
        "Boissons",
        &[
            ("Eau minérale 1.5L", 350, 300),
            ("Jus de bissap 1L", 1_000, 48),
            ("Café moulu 250g", 1_800, 36),
            ("Thé vert 100g", 600, 80),
        ],
    ),
    (
        "HYG",
        "Hygiène",
        &[
            ("Savon de Marseille", 400, 150),
            ("Lessive 1kg", 1_200, 70),
            ("Dentifrice 75ml", 700, 90),
            ("Eau de javel 1L", 500, 4),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut slot_path = String::from("./stockbook_dev.snapshot");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--slot" | "-s" => {
                if i + 1 < args.len() {
                    slot_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --slot <PATH>  Snapshot slot file (default: ./stockbook_dev.snapshot)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockbook Seed Data Generator");
    println!("=============================");
    println!("Slot: {}", slot_path);
    println!();

    let config = DbConfig::in_memory().snapshot_slot(SnapshotSlot::at(&slot_path));
    let db = Database::open(config).await?;

    println!("✓ Store opened");

    let Some(admin) = db
        .users()
        .list()
        .await?
        .into_iter()
        .map(|account| account.user)
        .find(|user| user.role == Role::Admin)
    else {
        println!("⚠ No administrator in this slot.");
        println!("  Run `stockbook` once against it to create one.");
        return Ok(());
    };

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Store already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!("Seeding as {}...", admin.email);

    let today = Utc::now().date_naive();
    let start = std::time::Instant::now();
    let mut products = 0;
    let mut movements = 0;

    for (prefix, category, lines) in CATALOG {
        for (index, (name, price, opening)) in lines.iter().enumerate() {
            let input = ProductInput {
                code: format!("{}-{:02}", prefix, index + 1),
                name: name.to_string(),
                category: Some(category.to_string()),
                initial_stock: 0,
                min_stock: 5,
                unit_price_cents: *price,
                purchase_price_cents: price * 70 / 100,
                reseller_price_cents: price * 90 / 100,
                image_path: None,
            };

            let product = match db.products().insert(&input, admin.id).await {
                Ok(product) => product,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", input.code, e);
                    continue;
                }
            };
            products += 1;

            let entry = NewMovement {
                date: today,
                kind: MovementKind::Entree,
                product_id: product.id,
                quantity: *opening,
                unit_price_cents: Some(input.purchase_price_cents),
                client_name: None,
                client_phone: None,
                comment: Some("Stock d'ouverture".into()),
            };
            db.movements().insert(&entry, admin.id).await?;
            movements += 1;
        }
    }

    db.flush().await?;

    println!();
    println!(
        "✓ Seeded {} products and {} movements in {:?}",
        products,
        movements,
        start.elapsed()
    );

    for (table, count) in db.table_counts().await? {
        println!("  {:<18} {}", table, count);
    }

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
