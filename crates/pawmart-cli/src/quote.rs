//! # Quote Subcommand
//!
//! Prices a cart file against a catalog file without a server or database.
//! Shipping and tax follow the same environment variables the API reads
//! (`FREE_SHIPPING_THRESHOLD`, `FLAT_SHIPPING`, `TAX_RATE_BPS`).
//!
//! ```yaml
//! lines:
//!   - slug: squeaky-ball
//!     quantity: 2
//! ```
//!
//! Exit code 0 when every line can be fulfilled, 2 when stock issues are
//! reported.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use pawmart_core::pricing::revalidate;
use pawmart_core::{CartLine, PricedLine, PricingPolicy, Quote, StockIssue, StockSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{load_catalog, CatalogFile};

/// Arguments for the `pawmart quote` subcommand.
#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Path to the catalog YAML file.
    pub catalog: PathBuf,

    /// Path to the cart YAML file.
    pub cart: PathBuf,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Deserialize)]
pub struct CartEntry {
    pub slug: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

/// Parsed cart file.
#[derive(Debug, Deserialize)]
pub struct CartFile {
    pub lines: Vec<CartEntry>,
}

/// Result of pricing a cart offline.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OfflineQuote {
    Priced { lines: Vec<PricedLine>, quote: Quote },
    Rejected { issues: Vec<StockIssue> },
}

/// Price the cart against the catalog.
///
/// Unknown slugs are an error rather than a stock issue.
pub fn price_cart(
    catalog: &CatalogFile,
    cart: &CartFile,
    policy: &PricingPolicy,
) -> Result<OfflineQuote> {
    let mut ids: HashMap<String, Uuid> = HashMap::new();
    let mut snapshots: HashMap<Uuid, StockSnapshot> = HashMap::new();
    for product in &catalog.products {
        let id = Uuid::new_v4();
        ids.insert(CatalogFile::slug_of(product), id);
        snapshots.insert(
            id,
            StockSnapshot {
                name: product.name.trim().to_string(),
                unit_price: product.price,
                stock: product.stock,
                active: product.active,
            },
        );
    }

    // Repeated slugs merge into one line.
    let mut lines: Vec<CartLine> = Vec::new();
    for entry in &cart.lines {
        let Some(&product_id) = ids.get(entry.slug.as_str()) else {
            bail!("unknown product slug {}", entry.slug);
        };
        match lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(entry.quantity),
            None => lines.push(CartLine {
                product_id,
                quantity: entry.quantity,
            }),
        }
    }

    match revalidate(&lines, &snapshots) {
        Ok(priced) => {
            let quote = policy.quote(&priced)?;
            Ok(OfflineQuote::Priced {
                lines: priced,
                quote,
            })
        }
        Err(issues) => Ok(OfflineQuote::Rejected { issues }),
    }
}

/// Execute the quote subcommand.
pub fn run_quote(args: &QuoteArgs) -> Result<u8> {
    let policy = pawmart_api::config::AppConfig::from_env()?.pricing;
    let catalog = load_catalog(&args.catalog)?;
    let cart: CartFile = crate::read_yaml(&args.cart)?;
    let result = price_cart(&catalog, &cart, &policy)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_table(&result);
    }

    Ok(match result {
        OfflineQuote::Priced { .. } => 0,
        OfflineQuote::Rejected { .. } => 2,
    })
}

fn print_table(result: &OfflineQuote) {
    match result {
        OfflineQuote::Priced { lines, quote } => {
            for line in lines {
                println!(
                    "{:<32} {:>3} x {:>8} = {:>9}",
                    line.name,
                    line.quantity,
                    line.unit_price.to_string(),
                    line.line_total.to_string()
                );
            }
            println!("{:<47} {:>9}", "subtotal", quote.subtotal.to_string());
            println!("{:<47} {:>9}", "shipping", quote.shipping.to_string());
            println!("{:<47} {:>9}", "tax", quote.tax.to_string());
            println!("{:<47} {:>9}", "total", quote.total.to_string());
        }
        OfflineQuote::Rejected { issues } => {
            for issue in issues {
                println!("cannot fulfil: {issue}");
            }
        }
    }
}
