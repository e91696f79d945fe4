//! Specificity resolution for requested CTS URNs.
//!
//! The hierarchy is only walked down to the work level. A request for
//! anything finer is answered with the canonical work-level path so the
//! caller can be redirected; sub-document content is reached through the
//! unit endpoints of the resolved work instead.

use tracing::debug;

use crate::error::{urn_context, ApiError};
use crate::models::Text;
use crate::store::{Store, TextQuery};
use crate::urn;

/// Outcome of resolving a requested identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A stored text has exactly this URN.
    Exact(Text),
    /// The URN is deeper than the work level. Carries the work-level URN,
    /// percent-encoded and terminated with `/`, ready to be appended to a
    /// route prefix.
    TooSpecific(String),
    /// No stored text, and nothing to redirect to.
    NotFound,
}

/// Resolve `requested` against the texts in `store`.
///
/// Over-specific identifiers are answered without touching storage,
/// whatever their locus looks like.
pub async fn resolve<S: Store + ?Sized>(store: &S, requested: &str) -> Result<Resolution, ApiError> {
    let parsed = urn::parse(requested);
    if parsed.is_too_specific() {
        let canonical = urn::encode_path(parsed.work());
        debug!(cts_urn = requested, depth = parsed.depth(), %canonical, "identifier too specific");
        return Ok(Resolution::TooSpecific(canonical));
    }

    let mut found = store.find_texts(&TextQuery::by_urn(requested)).await?;
    match found.len() {
        0 => Ok(Resolution::NotFound),
        1 => Ok(Resolution::Exact(found.remove(0))),
        n => Err(ApiError::StorageFailure {
            message: format!("{n} texts share the CTS URN {requested}"),
            context: urn_context(requested),
        }),
    }
}
