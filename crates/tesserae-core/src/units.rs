//! Grouping of a text's stored units by type.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::ApiError;
use crate::models::Text;
use crate::store::{Store, UnitQuery};

/// Unit type → unit URNs in document order.
pub type UnitGrouping = BTreeMap<String, Vec<String>>;

/// Unit types requested through query parameters such as `?lines=true`.
///
/// Only parameters whose value is `true` (any case) count as a request.
pub fn requested_types(params: &HashMap<String, String>) -> BTreeSet<String> {
    params
        .iter()
        .filter(|(_, v)| v.eq_ignore_ascii_case("true"))
        .map(|(k, _)| k.clone())
        .collect()
}

/// Collect the URNs of every requested unit type for `text`.
///
/// All-or-nothing: if any requested type has no stored units the whole
/// call fails with [`ApiError::PartialMiss`] naming every requested and
/// every missing type.
pub async fn aggregate<S: Store + ?Sized>(
    store: &S,
    text: &Text,
    requested: &BTreeSet<String>,
) -> Result<UnitGrouping, ApiError> {
    let mut grouping = UnitGrouping::new();
    let mut missing = BTreeSet::new();

    for unit_type in requested {
        let units = store
            .find_units(&UnitQuery {
                text: text.path.clone(),
                unit_type: unit_type.clone(),
            })
            .await?;
        if units.is_empty() {
            missing.insert(unit_type.clone());
        } else {
            grouping.insert(
                unit_type.clone(),
                units.into_iter().map(|u| u.cts_urn).collect(),
            );
        }
    }

    if !missing.is_empty() {
        return Err(ApiError::PartialMiss {
            cts_urn: text.cts_urn.clone(),
            requested: requested.clone(),
            missing,
        });
    }
    Ok(grouping)
}
