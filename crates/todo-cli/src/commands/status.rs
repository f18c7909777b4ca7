//! Status command handler

use anyhow::{Context, Result};

use todo_core::{Gateway, ItemService, SqliteGateway};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(service: &ItemService<SqliteGateway>, output: &Output) -> Result<()> {
    let gateway = service.gateway();
    let count = gateway.count().context("Failed to count items")?;
    let layout = gateway.layout();
    let db_path = gateway.store().path();
    let db_size = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);
    let location = db_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(in memory)".to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database_path": db_path,
                    "database_size": db_size,
                    "buckets": {
                        "root": layout.root_bucket,
                        "items": layout.items_bucket
                    },
                    "items": count
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", count);
        }
        OutputFormat::Human => {
            println!("Todo Status");
            println!("===========");
            println!();
            println!("Storage:");
            println!("  Location: {}", location);
            println!("  Size:     {}", format_size(db_size));
            println!("  Bucket:   {}/{}", layout.root_bucket, layout.items_bucket);
            println!();
            println!("Contents:");
            println!("  Items: {}", count);
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
