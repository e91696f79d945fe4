//! CTS URN parsing.
//!
//! A CTS URN is a colon-delimited path: `urn`, `cts`, the namespace, and the
//! work, optionally followed by a locus:
//!
//! ```text
//! urn:cts:latinLit:phi0472.phi001:28.14@[3]-28.15
//! └───────── work level ────────┘ └── locus ──┘
//! ```
//!
//! The locus is a period-delimited citation, optionally suffixed by a
//! bracketed offset (`@[3]`) and optionally extended into a range with `-`.
//!
//! Specificity depth is the number of colon-delimited segments. Anything
//! deeper than [`WORK_LEVEL_DEPTH`] addresses a position inside a work.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::ApiError;

/// Depth of a work-level URN (`urn:cts:<namespace>:<work>`).
pub const WORK_LEVEL_DEPTH: usize = 4;

/// Bytes left unescaped when building redirect paths: alphanumerics and
/// `_ . - ~`. Everything else, including `:`, is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// A URN split at its work boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrn<'a> {
    raw: &'a str,
    depth: usize,
    /// Byte index of the colon that ends the work-level prefix.
    work_end: Option<usize>,
}

/// Position (or range of positions) inside a work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub start: Citation,
    pub end: Option<Citation>,
}

/// A single citation such as `1.2` or `1.2@[11]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub components: Vec<String>,
    pub offset: Option<String>,
}

impl<'a> ParsedUrn<'a> {
    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True when the URN names a position inside a work rather than the work.
    pub fn is_too_specific(&self) -> bool {
        self.depth > WORK_LEVEL_DEPTH
    }

    /// The first [`WORK_LEVEL_DEPTH`] segments.
    pub fn work(&self) -> &'a str {
        match self.work_end {
            Some(end) => &self.raw[..end],
            None => self.raw,
        }
    }

    /// Everything after the work-level prefix, unparsed.
    pub fn locus_str(&self) -> Option<&'a str> {
        self.work_end.map(|end| &self.raw[end + 1..])
    }

    /// Parse the locus suffix, if there is one.
    ///
    /// Only callers that need the citation structure go through this;
    /// specificity never depends on the locus being well formed.
    pub fn locus(&self) -> Result<Option<Locus>, ApiError> {
        match self.locus_str() {
            Some(s) => parse_locus(s)
                .map(Some)
                .map_err(|reason| malformed(self.raw, reason)),
            None => Ok(None),
        }
    }
}

/// Split a raw identifier at its work boundary.
///
/// Never fails: depth only counts delimiters, and any identifier with a
/// fourth `:` has a work-level prefix to cut at.
pub fn parse(raw: &str) -> ParsedUrn<'_> {
    let depth = raw.matches(':').count() + 1;
    let work_end = raw
        .match_indices(':')
        .nth(WORK_LEVEL_DEPTH - 1)
        .map(|(i, _)| i);
    ParsedUrn {
        raw,
        depth,
        work_end,
    }
}

/// Percent-encode every `/`-separated piece of `path` and make sure the
/// result ends with `/`.
pub fn encode_path(path: &str) -> String {
    let mut encoded = path
        .split('/')
        .map(|piece| utf8_percent_encode(piece, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    if !encoded.ends_with('/') {
        encoded.push('/');
    }
    encoded
}

fn malformed(raw: &str, reason: impl Into<String>) -> ApiError {
    ApiError::MalformedIdentifier {
        cts_urn: raw.to_string(),
        reason: reason.into(),
    }
}

fn parse_locus(s: &str) -> Result<Locus, String> {
    if s.is_empty() {
        return Err("empty locus".to_string());
    }
    let (start, end) = match split_range(s)? {
        (start, Some(end)) => (start, Some(parse_citation(end)?)),
        (start, None) => (start, None),
    };
    Ok(Locus {
        start: parse_citation(start)?,
        end,
    })
}

/// Split `a-b` on the first `-` that is not inside an offset bracket.
fn split_range(s: &str) -> Result<(&str, Option<&str>), String> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced ']' in locus {s:?}"))?;
            }
            '-' if depth == 0 => return Ok((&s[..i], Some(&s[i + 1..]))),
            _ => {}
        }
    }
    if depth != 0 {
        return Err(format!("unbalanced '[' in locus {s:?}"));
    }
    Ok((s, None))
}

fn parse_citation(s: &str) -> Result<Citation, String> {
    let (reference, offset) = match s.find('@') {
        Some(at) => {
            let rest = &s[at + 1..];
            let inner = rest
                .strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .filter(|inner| !inner.is_empty() && !inner.contains(['[', ']']))
                .ok_or_else(|| format!("offset in {s:?} must be a bracketed value like @[3]"))?;
            (&s[..at], Some(inner.to_string()))
        }
        None => (s, None),
    };

    if reference.contains(['[', ']']) {
        return Err(format!("bracket without '@' offset marker in {s:?}"));
    }
    if reference.is_empty() {
        return Err(format!("empty citation in {s:?}"));
    }
    let components: Vec<String> = reference.split('.').map(str::to_string).collect();
    if components.iter().any(String::is_empty) {
        return Err(format!("empty citation component in {s:?}"));
    }
    Ok(Citation { components, offset })
}
