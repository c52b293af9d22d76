//! End-to-end walkthrough of the repository layer against the in-memory store.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin orders_demo
//!
//! # Point the repository at a different target
//! DOCSTORE_DATABASE=shop DOCSTORE_COLLECTION=orders cargo run --bin orders_demo
//! ```
//!
//! # Environment Variables
//!
//! - `DOCSTORE_DATABASE`: Database id (default: app)
//! - `DOCSTORE_COLLECTION`: Collection id (default: items)
//! - `DOCSTORE_MAX_PAGE_SIZE`: Default page-size cap (optional)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::{Context, Result};
use flexi_logger::Logger;
use serde::{Deserialize, Serialize};

use docstore::contracts::*;
use docstore::{
    field, CancellationToken, CrudRepository, Entity, InMemoryStore, SqlQuery, StoreSettings,
};

// ========================================
// Demo Entity
// ========================================

#[derive(Debug, Serialize, Deserialize)]
struct Order {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    customer: String,
    total: f64,
    open: bool,
}

impl Entity for Order {
    fn document_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn sample_orders() -> Vec<Order> {
    vec![
        Order {
            id: None,
            customer: "Alice".to_string(),
            total: 42.5,
            open: true,
        },
        Order {
            id: None,
            customer: "Bob".to_string(),
            total: 120.0,
            open: true,
        },
        Order {
            id: None,
            customer: "Carol".to_string(),
            total: 7.25,
            open: false,
        },
        Order {
            id: None,
            customer: "Dave".to_string(),
            total: 260.0,
            open: true,
        },
        Order {
            id: None,
            customer: "Erin".to_string(),
            total: 15.0,
            open: false,
        },
    ]
}

// ========================================
// Demo Walkthrough
// ========================================

async fn run_demo(settings: &StoreSettings) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let orders = CrudRepository::<Order>::new(
        settings.repository.database.clone(),
        settings.repository.collection.clone(),
        store,
        settings.request_options(),
    );
    let cancel = CancellationToken::new();

    // Provision the database and collection lazily
    orders.ready(&cancel).await?;
    println!("Provisioned target collection");

    // Create
    let mut first_id = String::new();
    let seed = sample_orders();
    println!("Seeding {} orders...", seed.len());
    for order in &seed {
        let created = orders.add(order, &cancel).await?;
        let id = created
            .id()
            .context("store did not assign a document id")?;
        if first_id.is_empty() {
            first_id = id.to_string();
        }
        println!("  created {} for {}", id, order.customer);
    }

    // Point read
    let fetched = orders
        .get(&first_id, &cancel)
        .await?
        .context("seeded order went missing")?;
    println!(
        "Fetched {}: customer={} total={}",
        first_id, fetched.customer, fetched.total
    );

    // Counts
    let total = orders.count(&cancel).await?;
    let open = orders
        .count_matching(&field("open").eq(true), &cancel)
        .await?;
    println!("{} orders total, {} open", total, open);

    // Filtered paging
    let mut open_orders = orders.query().filter(field("open").eq(true)).take(2);
    let mut page_no = 0;
    while let Some(page) = open_orders.next_page(&cancel).await? {
        page_no += 1;
        println!("  page {}: {} open orders", page_no, page.len());
    }

    // Raw SQL with a named parameter
    let sql = SqlQuery::new("SELECT * FROM c WHERE c.total > @min")
        .with_parameter("@min", 100.0);
    let mut big_orders = orders.query_raw(sql);
    while let Some(page) = big_orders.next_page(&cancel).await? {
        for order in &page.items {
            println!("  large order: {} ({})", order.customer, order.total);
        }
    }

    // Replace
    let mut closing = fetched;
    closing.open = false;
    closing.id = Some(first_id.clone());
    orders.update(&first_id, &closing, &cancel).await?;
    println!(
        "Closed {}: {} open orders remain",
        first_id,
        orders.count_matching(&field("open").eq(true), &cancel).await?
    );

    // Delete one, then drop the collection
    orders.delete(&first_id, &cancel).await?;
    println!("Deleted {}", first_id);

    orders.delete_all(&cancel).await?;
    println!("Dropped the collection");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _logger = Logger::try_with_env_or_str("info")
        .context("invalid log specification")?
        .start()
        .context("failed to start logger")?;

    let settings = StoreSettings::from_env()?;

    println!("=== Orders Demo ===");
    println!("Database: {}", settings.repository.database);
    println!("Collection: {}", settings.repository.collection);
    println!();

    match run_demo(&settings).await {
        Ok(()) => {
            println!();
            println!("✓ Demo completed successfully!");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Demo failed: {}", e);
            Err(e)
        }
    }
}
