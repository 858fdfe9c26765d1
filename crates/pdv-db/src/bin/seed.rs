//! # Seed Data Generator
//!
//! Populates a database with a plaster-shop catalog for development.
//!
//! ## Usage
//! ```bash
//! # Default database path
//! cargo run -p pdv-db --bin seed
//!
//! # Specify database path
//! cargo run -p pdv-db --bin seed -- --db ./data/pdv.db
//! ```
//!
//! ## Generated Data
//! - Products: plates, crown mouldings (sancas), frames, plaster bags and
//!   accessories, each in a few sizes
//! - A handful of customers and one supplier
//!
//! Prices and stock are derived from the product index so runs are
//! reproducible.

use std::env;

use pdv_core::{CustomerInput, ProductInput, SupplierInput};
use pdv_db::{Database, DbConfig};

/// Product families: (category, base names).
const CATALOG: &[(&str, &[&str])] = &[
    (
        "Placas",
        &["Placa de gesso lisa", "Placa de gesso estampada", "Placa drywall ST", "Placa drywall RU"],
    ),
    (
        "Sancas",
        &["Sanca aberta", "Sanca fechada", "Sanca invertida", "Sanca com negativo"],
    ),
    ("Molduras", &["Moldura lisa", "Moldura trabalhada", "Roda-teto", "Cantoneira"]),
    ("Gesso", &["Gesso em pó", "Gesso cola", "Massa para drywall"]),
    ("Acessórios", &["Arame galvanizado", "Sisal", "Parafuso drywall", "Fita telada"]),
];

/// Size variants: (suffix, price addon in centavos).
const SIZES: &[(&str, i64)] = &[("P", 0), ("M", 450), ("G", 900)];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Maria Aparecida Souza", "(62) 98123-4567"),
    ("Construtora Horizonte", "(62) 3321-0099"),
    ("João Batista Lima", "(62) 99654-1122"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./pdv_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PDV Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./pdv_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 PDV Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    for (family_idx, (category, names)) in CATALOG.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                let seed = family_idx * 100 + name_idx * 10 + size_idx;
                let input = generate_product(category, name, size, *addon, seed);
                if let Err(e) = db.products().insert(input).await {
                    eprintln!("Failed to insert {} {}: {}", name, size, e);
                    continue;
                }
                generated += 1;
            }
        }
    }
    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    for (name, phone) in CUSTOMERS {
        db.customers()
            .insert(CustomerInput {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                city: Some("Goiânia".to_string()),
                state: Some("GO".to_string()),
                ..Default::default()
            })
            .await?;
    }
    println!("✓ Generated {} customers", CUSTOMERS.len());

    db.suppliers()
        .insert(SupplierInput {
            name: "Gesso Centro-Oeste".to_string(),
            company_name: Some("Gesso Centro-Oeste Ltda".to_string()),
            contact_person: Some("Renato".to_string()),
            ..Default::default()
        })
        .await?;
    println!("✓ Generated 1 supplier");

    let found = db.products().search("sanca", 10).await?;
    println!();
    println!("  Search 'sanca': {} results", found.len());
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one product with reproducible price, cost and stock.
fn generate_product(category: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> ProductInput {
    // R$ 8,90 - R$ 48,90 plus the size addon
    let price_cents = 890 + ((seed * 37) % 4000) as i64 + price_addon;
    // Cost 45-65% of price
    let cost_cents = price_cents * (45 + (seed % 20) as i64) / 100;

    ProductInput {
        name: format!("{} {}", name, size),
        category: category.to_string(),
        description: None,
        barcode: Some(format!("789{:010}", seed)),
        price_cents,
        cost_cents,
        stock: (seed % 60) as i64,
        min_stock: None,
    }
}
