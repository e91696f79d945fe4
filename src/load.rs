//! Corpus manifest loading.
//!
//! A manifest is a JSON file describing texts, their pre-segmented units
//! and any stopword lists:
//!
//! ```json
//! {
//!   "texts": [{"cts_urn": "urn:cts:latinLit:phi0917.phi001", "author": "lucan", ...}],
//!   "units": [{"cts_urn": "urn:cts:latinLit:phi0917.phi001:1.1",
//!              "text": "/la/lucan.bellum_civile.tess", "unit_type": "lines"}],
//!   "stopword_lists": [{"name": "latin", "stopwords": ["et", "in"]}]
//! }
//! ```
//!
//! Every unit must refine the work URN of the text its `text` path points
//! to, whether that text is in the same manifest or already stored. The
//! whole manifest is validated before anything is written.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use tesserae_core::models::{StopwordList, Text, Unit};
use tesserae_core::store::{Store, TextQuery};
use tesserae_core::urn;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub texts: Vec<Text>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub stopword_lists: Vec<StopwordList>,
}

/// What a load actually wrote.
#[derive(Debug, Default, PartialEq)]
pub struct LoadReport {
    pub texts_inserted: usize,
    /// Texts whose `cts_urn` was already stored.
    pub texts_skipped: usize,
    pub units_inserted: usize,
    pub stopword_lists: usize,
}

pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

/// Validate `manifest` against `store` and write it.
pub async fn load_manifest<S: Store + ?Sized>(store: &S, manifest: &Manifest) -> Result<LoadReport> {
    for text in &manifest.texts {
        if urn::parse(&text.cts_urn).is_too_specific() {
            bail!("text {} is not a work-level CTS URN", text.cts_urn);
        }
    }

    let stored = store.find_texts(&TextQuery::default()).await?;
    let mut works_by_path: HashMap<&str, &str> = stored
        .iter()
        .map(|t| (t.path.as_str(), t.cts_urn.as_str()))
        .collect();
    for text in &manifest.texts {
        // Already stored texts are skipped on insert, so their stored path wins.
        if stored.iter().any(|t| t.cts_urn == text.cts_urn) {
            continue;
        }
        if let Some(owner) = works_by_path.insert(text.path.as_str(), text.cts_urn.as_str()) {
            bail!(
                "text {} uses path {}, which already belongs to {}",
                text.cts_urn,
                text.path,
                owner
            );
        }
    }

    for unit in &manifest.units {
        let Some(work) = works_by_path.get(unit.text.as_str()) else {
            bail!("unit {} references unknown text path {}", unit.cts_urn, unit.text);
        };
        let parsed = urn::parse(&unit.cts_urn);
        if !parsed.is_too_specific() {
            bail!("unit {} has no locus below the work level", unit.cts_urn);
        }
        parsed.locus()?;
        if parsed.work() != *work {
            bail!(
                "unit {} does not belong to {} (text path {})",
                unit.cts_urn,
                work,
                unit.text
            );
        }
    }

    let inserted = store.insert_texts(&manifest.texts).await?;
    let units = if manifest.units.is_empty() {
        0
    } else {
        store.insert_units(&manifest.units).await?.inserted_ids.len()
    };
    for list in &manifest.stopword_lists {
        store.upsert_stopword_list(list).await?;
    }

    Ok(LoadReport {
        texts_inserted: inserted.inserted_ids.len(),
        texts_skipped: manifest.texts.len() - inserted.inserted_ids.len(),
        units_inserted: units,
        stopword_lists: manifest.stopword_lists.len(),
    })
}

/// CLI entry point for `tv5 load <file>`. Creates the schema if needed.
pub async fn run_load(config: &Config, path: &Path) -> Result<()> {
    let manifest = read_manifest(path)?;
    let pool = db::connect(&config.db.path).await?;
    migrate::migrate_pool(&pool).await?;
    let store = SqliteStore::new(pool);

    let report = load_manifest(&store, &manifest).await;
    store.pool().close().await;
    let report = report?;

    println!("Loaded {}", path.display());
    println!(
        "  texts:          {} inserted, {} already present",
        report.texts_inserted, report.texts_skipped
    );
    println!("  units:          {}", report.units_inserted);
    println!("  stopword lists: {}", report.stopword_lists);
    Ok(())
}
