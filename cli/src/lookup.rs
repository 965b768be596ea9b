//! LOOKUP - Fetch one object version from the datastore.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use taxii_store::{Datastore, SqliteStore};

/// Arguments for an object lookup.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// SQLite database file
    #[arg(short = 'f', long, env = "TAXII_DB_FILE")]
    pub filename: PathBuf,

    /// STIX object id, e.g. indicator--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f
    #[arg(short = 's', long)]
    pub stixid: String,

    /// Version to fetch: a timestamp, "first" or "last"
    #[arg(short = 'v', long)]
    pub stixversion: String,
}

/// Run the lookup and return the object as indented JSON.
pub async fn execute(args: &LookupArgs) -> Result<String> {
    if !args.filename.is_file() {
        bail!("database file not found: {}", args.filename.display());
    }

    let store = SqliteStore::open(&args.filename, 1)
        .await
        .with_context(|| format!("cannot open {}", args.filename.display()))?;

    let object = store.get_object(None, &args.stixid, &args.stixversion).await?;

    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    object.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}
