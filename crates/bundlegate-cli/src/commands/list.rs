//! List command
//!
//! Usage: bundlegate list [<FILTER>...]

use bundlegate_core::ContentUri;
use bundlegate_engine::{Gateway, Selection};
use clap::Args;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Positional filters passed to the store (e.g. service, name, offset, limit)
    pub filters: Vec<String>,

    /// Print rows as JSON objects, one per line
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ListArgs, gateway: &Gateway) -> Result<(), Box<dyn std::error::Error>> {
    let table = gateway.query(
        &ContentUri::root(gateway.authority()),
        &Selection::args(args.filters),
    )?;

    if args.json {
        for row in table.rows() {
            let object: serde_json::Map<String, serde_json::Value> = table
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().cloned().map(serde_json::Value::from))
                .collect();
            println!("{}", serde_json::Value::Object(object));
        }
    } else {
        println!("{}", table.columns().join("\t"));
        for row in table.rows() {
            println!("{}", row.join("\t"));
        }
    }
    Ok(())
}
