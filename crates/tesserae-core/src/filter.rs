//! Query-parameter filters for the text listing.
//!
//! Equality filters apply to a fixed set of fields; anything else in the
//! query string is ignored. Year bounds follow this table:
//!
//! | `before` | `after` | texts selected |
//! |----------|---------|----------------|
//! | –        | –       | all |
//! | b        | –       | `year <= b` |
//! | –        | a       | `year >= a` |
//! | b        | a       | `year < b` or `year > a` |
//!
//! When both bounds are given the result is the band *outside* them, never
//! the range between.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ApiError;
use crate::store::{TextQuery, YearRange};

/// Build a [`TextQuery`] from already-typed filters.
///
/// Only `author`, `is_prose`, `language` and `title` are read from
/// `equality_filters`; other keys are dropped. Fails only when `is_prose`
/// is not a boolean.
pub fn build_query(
    equality_filters: &HashMap<String, String>,
    before: Option<i64>,
    after: Option<i64>,
) -> Result<TextQuery, ApiError> {
    let field = |name: &str| equality_filters.get(name).cloned();
    let is_prose = match equality_filters.get("is_prose") {
        Some(raw) => Some(parse_bool("is_prose", raw)?),
        None => None,
    };

    Ok(TextQuery {
        cts_urn: None,
        author: field("author"),
        is_prose,
        language: field("language"),
        title: field("title"),
        years: year_ranges(before, after),
    })
}

/// Build a [`TextQuery`] straight from request query parameters.
///
/// A `before` or `after` that is not an integer is a validation error.
pub fn query_from_params(params: &HashMap<String, String>) -> Result<TextQuery, ApiError> {
    let before = parse_bound("before", params.get("before"))?;
    let after = parse_bound("after", params.get("after"))?;
    build_query(params, before, after)
}

fn year_ranges(before: Option<i64>, after: Option<i64>) -> Vec<YearRange> {
    match (before, after) {
        (None, None) => Vec::new(),
        (Some(before), None) => vec![YearRange {
            low: i64::MIN,
            high: before,
        }],
        (None, Some(after)) => vec![YearRange {
            low: after,
            high: i64::MAX,
        }],
        (Some(before), Some(after)) => {
            let below = before.checked_sub(1).map(|high| YearRange { low: i64::MIN, high });
            let above = after.checked_add(1).map(|low| YearRange { low, high: i64::MAX });
            let ranges: Vec<YearRange> = below.into_iter().chain(above).collect();
            if ranges.is_empty() {
                // Both halves overflowed: nothing is strictly outside.
                vec![YearRange { low: 1, high: 0 }]
            } else {
                ranges
            }
        }
    }
}

fn parse_bound(name: &str, raw: Option<&String>) -> Result<Option<i64>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim().parse::<i64>().map(Some).map_err(|_| {
        ApiError::validation(format!("\"{name}\" must be an integer (got {raw:?})."))
            .with(name, Value::String(raw.clone()))
    })
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ApiError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(
            ApiError::validation(format!("\"{name}\" must be true or false (got {raw:?})."))
                .with(name, Value::String(raw.to_string())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn selects(query: &TextQuery, year: i64) -> bool {
        query.years.is_empty() || query.years.iter().any(|r| r.contains(year))
    }

    #[test]
    fn test_no_bounds_no_year_constraint() {
        let q = build_query(&HashMap::new(), None, None).unwrap();
        assert!(q.years.is_empty());
        assert_eq!(q, TextQuery::default());
    }

    #[test]
    fn test_before_only_is_inclusive() {
        let q = build_query(&HashMap::new(), Some(100), None).unwrap();
        assert!(selects(&q, 100));
        assert!(selects(&q, -500));
        assert!(!selects(&q, 101));
    }

    #[test]
    fn test_after_only_is_inclusive() {
        let q = build_query(&HashMap::new(), None, Some(100)).unwrap();
        assert!(selects(&q, 100));
        assert!(selects(&q, 2018));
        assert!(!selects(&q, 99));
    }

    #[test]
    fn test_both_bounds_exclude_the_bound_itself() {
        let q = build_query(&HashMap::new(), Some(100), Some(100)).unwrap();
        assert!(selects(&q, 99));
        assert!(!selects(&q, 100));
        assert!(selects(&q, 101));
    }

    #[test]
    fn test_both_bounds_select_outside_band() {
        // before < after: everything strictly outside [before, after]
        let q = build_query(&HashMap::new(), Some(0), Some(100)).unwrap();
        assert!(selects(&q, -19));
        assert!(!selects(&q, 0));
        assert!(!selects(&q, 65));
        assert!(!selects(&q, 100));
        assert!(selects(&q, 101));
    }

    #[test]
    fn test_both_bounds_at_extremes_do_not_overflow() {
        let q = build_query(&HashMap::new(), Some(i64::MIN), Some(i64::MAX)).unwrap();
        assert!(!selects(&q, 0));
        assert!(!selects(&q, i64::MIN));
        assert!(!selects(&q, i64::MAX));
    }

    #[test]
    fn test_equality_filters_and_unknown_fields() {
        let q = query_from_params(&params(&[
            ("author", "vergil"),
            ("language", "latin"),
            ("is_prose", "False"),
            ("genre", "epic"),
        ]))
        .unwrap();
        assert_eq!(q.author.as_deref(), Some("vergil"));
        assert_eq!(q.language.as_deref(), Some("latin"));
        assert_eq!(q.is_prose, Some(false));
        assert_eq!(q.title, None);
    }

    #[test]
    fn test_non_integer_bound_is_rejected() {
        let err = query_from_params(&params(&[("after", "1st century")])).unwrap_err();
        match err {
            ApiError::Validation { message, context } => {
                assert!(message.contains("after"));
                assert_eq!(context["after"], "1st century");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_bounds_parse() {
        let q = query_from_params(&params(&[("before", "-44")])).unwrap();
        assert!(selects(&q, -44));
        assert!(!selects(&q, -43));
    }

    #[test]
    fn test_bad_is_prose_is_rejected() {
        assert!(matches!(
            query_from_params(&params(&[("is_prose", "sometimes")])),
            Err(ApiError::Validation { .. })
        ));
    }
}
