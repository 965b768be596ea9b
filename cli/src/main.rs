//! Command-line object lookup against a TAXII SQLite datastore.
//!
//! Prints one STIX object version as indented JSON:
//!
//! ```text
//! taxii-lookup -f taxii.db -s indicator--1 -v last
//! ```
//!
//! Configuration via environment:
//! - TAXII_DB_FILE: Database file, when `--filename` is not given

mod lookup;

use clap::Parser;

use lookup::LookupArgs;

/// Look up a STIX object in a TAXII datastore.
#[derive(Parser)]
#[command(name = "taxii-lookup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    lookup: LookupArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match lookup::execute(&cli.lookup).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
