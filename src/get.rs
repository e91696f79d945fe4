//! Text lookup by CTS URN.
//!
//! Used by the `tv5 get` CLI command. Resolution is the same as
//! `GET /texts/{urn}/`: an identifier finer than the work level is not
//! looked up but answered with its work-level form.

use anyhow::{bail, Result};

use tesserae_core::resolve::{resolve, Resolution};
use tesserae_core::urn;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Resolve `cts_urn` against the configured database.
pub async fn get_text(config: &Config, cts_urn: &str) -> Result<Resolution> {
    let pool = db::connect(&config.db.path).await?;
    let store = SqliteStore::new(pool);
    let resolution = resolve(&store, cts_urn).await;
    store.pool().close().await;
    Ok(resolution?)
}

/// CLI entry point: resolves the URN and prints the text as JSON.
pub async fn run_get(config: &Config, cts_urn: &str) -> Result<()> {
    match get_text(config, cts_urn).await? {
        Resolution::Exact(text) => {
            println!("{}", serde_json::to_string_pretty(&text)?);
            Ok(())
        }
        Resolution::TooSpecific(_) => {
            let work = urn::parse(cts_urn).work();
            println!("{cts_urn} is finer than the work level.");
            println!("Try: tv5 get {work}");
            Ok(())
        }
        Resolution::NotFound => bail!("no text with the CTS URN {cts_urn}"),
    }
}
