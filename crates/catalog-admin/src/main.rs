//! Catalog administration tool.
//!
//! Connects to MongoDB, runs the startup index pass and inspects the catalog.

mod config;

use std::sync::Arc;

use clap::Parser;
use helios_catalog::backends::mongodb::MongoStore;
use helios_catalog::{Catalog, IndexReport, SearchRequest};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::{AdminConfig, Command};

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("helios_catalog={},catalog_admin={}", level, level))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AdminConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let catalog_config = config.catalog_config();
    info!(
        host = %config.mongo_host,
        database = %catalog_config.database,
        "Connecting to MongoDB"
    );
    let store = MongoStore::connect(&config.mongo_config(), &catalog_config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to MongoDB: {}", e))?;
    let catalog = Catalog::new(Arc::new(store), catalog_config);

    let result = run(&catalog, &config.command).await;

    if let Err(e) = catalog.shutdown().await {
        warn!(error = %e, "MongoDB client did not shut down cleanly");
    }
    result
}

async fn run(catalog: &Catalog, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::InitIndexes => {
            match catalog.initialize().await? {
                Some(report) => print_report(&report)?,
                None => info!("Index creation disabled, nothing to do"),
            }
            Ok(())
        }
        Command::Summary { page_size } => {
            if let Some(report) = catalog.initialize().await?
                && !report.is_complete()
            {
                warn!(failed = report.failed.len(), "Some indexes could not be created");
            }
            let summary = summarize(catalog, *page_size).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

fn print_report(report: &IndexReport) -> anyhow::Result<()> {
    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|(index, error)| json!({ "index": index, "error": error }))
        .collect();
    let output = json!({ "created": report.created, "failed": failed });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !report.is_complete() {
        anyhow::bail!("{} index(es) could not be created", report.failed.len());
    }
    Ok(())
}

/// Lists every collection with the number of items it holds.
async fn summarize(catalog: &Catalog, page_size: u64) -> anyhow::Result<Value> {
    let mut collections = Vec::new();
    let mut total = 0u64;
    let mut token: Option<String> = None;

    loop {
        let page = catalog
            .list_collections(token.as_deref(), Some(page_size))
            .await?;

        for collection in &page.collections {
            let Some(id) = collection.get("id").and_then(Value::as_str) else {
                continue;
            };
            let items = catalog
                .search(
                    &SearchRequest::new()
                        .with_collections([id])
                        .with_limit(1),
                )
                .await?
                .matched
                .unwrap_or(0);
            total += items;
            collections.push(json!({ "id": id, "items": items }));
        }

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    info!(collections = collections.len(), items = total, "Catalog summary complete");
    Ok(json!({ "collections": collections, "total_items": total }))
}
