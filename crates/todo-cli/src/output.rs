//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde::Serialize;

use todo_core::Item;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single item
    pub fn print_item(&self, item: &Item) -> Result<()> {
        match self.format {
            OutputFormat::Human => println!("{}", format_item(item)),
            OutputFormat::Json => print_json(item)?,
            OutputFormat::Quiet => println!("{}", item.id),
        }
        Ok(())
    }

    /// Print a list of items
    pub fn print_items(&self, items: &[Item]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No items found.");
                    return Ok(());
                }
                for item in items {
                    println!("{}", format_item(item));
                }
                println!("\n{} item(s)", items.len());
            }
            OutputFormat::Json => print_json(&items)?,
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.id);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line human rendering of an item
fn format_item(item: &Item) -> String {
    let mark = if item.is_completed { "x" } else { " " };
    format!("{:>4} [{}] {}", item.id, mark, item.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_format_item() {
        assert_eq!(
            format_item(&Item::new(1, "buy milk", false)),
            "   1 [ ] buy milk"
        );
        assert_eq!(
            format_item(&Item::new(12, "get mail", true)),
            "  12 [x] get mail"
        );
    }
}
