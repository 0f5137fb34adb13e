//! Codec for PBS's property-string wire format.
//!
//! ```text
//! propstring := segment ("," segment)*
//! segment    := key "=" value
//! key        := [A-Za-z0-9_-]+           ; case-folded to lowercase on parse
//! value      := bare | quoted
//! bare       := chars excluding ',' '"' ' ' and surrounding whitespace trimmed
//! quoted     := '"' ( escaped | any-char-except-'"' )* '"'
//! escaped    := '\' ( '"' | '\' )
//! ```
//!
//! `format(parse(s))` is a canonical form: keys sorted lexicographically,
//! empty values dropped, and any value containing `,`, `"`, or whitespace
//! quoted. It is not necessarily equal to `s`, but is idempotent under
//! re-parsing.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use pbsctl_error::{ErrorCode, PbsError};
use std::collections::BTreeMap;

/// An ordered mapping from lowercase keys to string values, as used for PBS's
/// `notify`, `tuning`, `maintenance-mode`, and `backend` fields.
///
/// Backed by a [`BTreeMap`] so lexicographic key order — the canonical output
/// order the format side needs — falls out of the type for free.
pub type PropertyMap = BTreeMap<String, String>;

/// Parses a property string into a [`PropertyMap`].
///
/// An empty string parses to an empty map. Keys are folded to lowercase;
/// surrounding whitespace around bare values is trimmed.
pub fn parse(input: &str) -> Result<PropertyMap, PbsError> {
    let mut map = PropertyMap::new();
    if input.is_empty() {
        return Ok(map);
    }

    for segment in split_unquoted(input, ',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, value) = split_segment(segment)?;
        map.insert(key.to_lowercase(), value);
    }

    Ok(map)
}

/// Formats a [`PropertyMap`] into its canonical property-string form.
///
/// Keys are already sorted by virtue of `BTreeMap`'s iteration order. Empty
/// values are dropped entirely (the key disappears from the output). A value
/// is quoted, with internal `"` escaped as `\"`, whenever it contains a `,`,
/// a `"`, or any ASCII whitespace.
pub fn format(map: &PropertyMap) -> String {
    map.iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={}", format_value(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_value(value: &str) -> String {
    if needs_quoting(value) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

fn needs_quoting(value: &str) -> bool {
    value.chars().any(|c| c == ',' || c == '"' || c.is_whitespace())
}

/// Splits `segment` on the first unquoted `=`, decoding the value side.
fn split_segment(segment: &str) -> Result<(&str, String), PbsError> {
    let bytes = segment.as_bytes();
    let mut in_quotes = false;
    let mut idx = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b'=' if !in_quotes => {
                idx = Some(i);
                break;
            }
            b'\\' if in_quotes => i += 1,
            _ => {}
        }
        i += 1;
    }

    let idx = idx.ok_or_else(|| {
        PbsError::new(
            ErrorCode::TransportMalformedResponse,
            format!("property-string segment has no '=': {segment:?}"),
        )
        .with_context("segment", segment)
    })?;

    let key = segment[..idx].trim();
    let raw_value = segment[idx + 1..].trim();
    let value = decode_value(raw_value)?;
    Ok((key, value))
}

fn decode_value(raw: &str) -> Result<String, PbsError> {
    let Some(stripped) = raw.strip_prefix('"') else {
        return Ok(raw.to_string());
    };
    let Some(inner) = stripped.strip_suffix('"') else {
        return Err(PbsError::new(
            ErrorCode::TransportMalformedResponse,
            format!("unterminated quoted value: {raw:?}"),
        ));
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Splits `input` on unquoted occurrences of `delim`, honoring `"`-quoting
/// and `\`-escaping inside quotes.
fn split_unquoted(input: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] as char {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => i += 1,
            c if c == delim && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_string_parses_to_empty_map() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn simple_bare_pairs() {
        let parsed = parse("type=offline,schedule=daily").unwrap();
        assert_eq!(parsed, map(&[("type", "offline"), ("schedule", "daily")]));
    }

    #[test]
    fn keys_are_lowercased() {
        let parsed = parse("Type=Offline").unwrap();
        assert_eq!(parsed.get("type").map(String::as_str), Some("Offline"));
    }

    #[test]
    fn quoted_value_with_comma_and_space() {
        let parsed = parse(r#"message="Planned, downtime""#).unwrap();
        assert_eq!(parsed.get("message").unwrap(), "Planned, downtime");
    }

    #[test]
    fn escaped_quote_in_quoted_value() {
        let parsed = parse(r#"message="Planned, \"urgent\" maintenance""#).unwrap();
        assert_eq!(parsed.get("message").unwrap(), "Planned, \"urgent\" maintenance");
    }

    #[test]
    fn surrounding_whitespace_trimmed() {
        let parsed = parse(" type = offline ").unwrap();
        assert_eq!(parsed.get("type").map(String::as_str), Some("offline"));
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let err = parse(r#"message="unterminated"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::TransportMalformedResponse);
    }

    #[test]
    fn missing_equals_is_malformed() {
        let err = parse("justakey").unwrap_err();
        assert_eq!(err.code, ErrorCode::TransportMalformedResponse);
    }

    #[test]
    fn format_sorts_keys_and_drops_empty_values() {
        let m = map(&[("z", ""), ("a", "1"), ("m", "2")]);
        assert_eq!(format(&m), "a=1,m=2");
    }

    #[test]
    fn format_quotes_values_needing_it() {
        let m = map(&[("message", "Planned, \"urgent\" maintenance"), ("type", "offline")]);
        assert_eq!(
            format(&m),
            r#"message="Planned, \"urgent\" maintenance",type=offline"#
        );
    }

    #[test]
    fn end_to_end_spec_example() {
        let m = map(&[("type", "offline"), ("message", "Planned, \"urgent\" maintenance")]);
        let formatted = format(&m);
        assert_eq!(
            formatted,
            r#"message="Planned, \"urgent\" maintenance",type=offline"#
        );
        let reparsed = parse(&formatted).unwrap();
        assert_eq!(reparsed, m);
    }

    #[test]
    fn backend_property_string_shape() {
        let parsed = parse("type=s3,client=ep1,bucket=b").unwrap();
        assert_eq!(
            parsed,
            map(&[("type", "s3"), ("client", "ep1"), ("bucket", "b")])
        );
    }

    fn arb_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,15}".prop_map(String::from)
    }

    fn arb_value() -> impl Strategy<Value = String> {
        "[ -~]{1,20}".prop_filter("values must not be empty after generation", |s| !s.is_empty())
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_map(pairs in prop::collection::vec((arb_key(), arb_value()), 0..8)) {
            let m: PropertyMap = pairs.into_iter().collect();
            let formatted = format(&m);
            let reparsed = parse(&formatted).unwrap();
            prop_assert_eq!(reparsed, m);
        }

        #[test]
        fn format_is_idempotent_under_reparse(pairs in prop::collection::vec((arb_key(), arb_value()), 0..8)) {
            let m: PropertyMap = pairs.into_iter().collect();
            let once = format(&parse(&format(&m)).unwrap());
            let twice = format(&parse(&once).unwrap());
            prop_assert_eq!(once, twice);
        }
    }
}
