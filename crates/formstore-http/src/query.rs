//! Query string and `application/x-www-form-urlencoded` decoding.
//!
//! This follows the lenient legacy form rules rather than the WHATWG
//! algorithm:
//! - A pair must contain exactly one `=`; anything else is dropped
//! - Only values are decoded (`+` to space, then `%XX`); names are kept raw
//! - Pairs whose decoded value is empty are dropped entirely
//! - Repeated names keep their values in encounter order
//!
//! # Example
//!
//! ```
//! use formstore_http::parse_qs;
//!
//! let qs = parse_qs("a=1&b=&c=x%20y&d=1=2");
//!
//! assert_eq!(qs.first("a").map(String::as_str), Some("1"));
//! assert!(!qs.contains("b"));
//! assert_eq!(qs.first("c").map(String::as_str), Some("x y"));
//! assert!(!qs.contains("d"));
//! ```

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use crate::field_map::FieldMap;

/// Decoded query values, keyed by raw field name.
pub type QueryValues = FieldMap<String>;

/// Parse a query string (without the leading `?`).
#[must_use]
pub fn parse_qs(qs: &str) -> QueryValues {
    let mut values = QueryValues::new();
    for (name, value) in parse_qsl(qs) {
        values.append(name, value);
    }
    values
}

/// Parse a query string into pairs, keeping encounter order across names.
///
/// Applies the same dropping rules as [`parse_qs`].
#[must_use]
pub fn parse_qsl(qs: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for pair in qs.split('&') {
        let mut pieces = pair.split('=');
        let (Some(name), Some(raw), None) = (pieces.next(), pieces.next(), pieces.next()) else {
            continue;
        };
        let value = percent_decode(raw);
        if !value.is_empty() {
            pairs.push((name.to_string(), value.into_owned()));
        }
    }
    pairs
}

/// Percent-decode a form value.
///
/// `+` becomes a space before `%XX` sequences are decoded. Malformed
/// sequences pass through unchanged and invalid UTF-8 is replaced with
/// U+FFFD.
///
/// # Example
///
/// ```
/// use formstore_http::percent_decode;
///
/// // No decoding needed - returns borrowed
/// let simple = percent_decode("hello");
/// assert!(matches!(simple, std::borrow::Cow::Borrowed(_)));
///
/// assert_eq!(&*percent_decode("hello+world%21"), "hello world!");
/// assert_eq!(&*percent_decode("100%"), "100%");
/// ```
#[must_use]
pub fn percent_decode(s: &str) -> Cow<'_, str> {
    // Fast path: no encoding
    if !s.contains(['%', '+']) {
        return Cow::Borrowed(s);
    }

    let spaced = s.replace('+', " ");
    Cow::Owned(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn values<'a>(qs: &'a QueryValues, name: &str) -> Vec<&'a str> {
        qs.get(name)
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn empty_query_string() {
        let qs = parse_qs("");
        assert!(qs.is_empty());
        assert_eq!(qs.get("any"), None);
    }

    #[test]
    fn duplicate_keys_keep_order() {
        let qs = parse_qs("a=1&a=2&b=3");
        assert_eq!(values(&qs, "a"), vec!["1", "2"]);
        assert_eq!(values(&qs, "b"), vec!["3"]);
        assert_eq!(qs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn empty_value_drops_the_key() {
        let qs = parse_qs("a=&b=1");
        assert!(!qs.contains("a"));
        assert_eq!(values(&qs, "b"), vec!["1"]);
        assert_eq!(qs.len(), 1);
    }

    #[test]
    fn pair_with_two_equals_is_discarded() {
        let qs = parse_qs("a=1=2&b=3");
        assert!(!qs.contains("a"));
        assert_eq!(values(&qs, "b"), vec!["3"]);
    }

    #[test]
    fn key_without_value_is_discarded() {
        let qs = parse_qs("flag&name=alice&");
        assert!(!qs.contains("flag"));
        assert_eq!(values(&qs, "name"), vec!["alice"]);
        assert_eq!(qs.len(), 1);
    }

    #[test]
    fn value_is_decoded() {
        let qs = parse_qs("msg=hello+world&word=caf%C3%A9&data=a%26b%3Dc");
        assert_eq!(values(&qs, "msg"), vec!["hello world"]);
        assert_eq!(values(&qs, "word"), vec!["café"]);
        assert_eq!(values(&qs, "data"), vec!["a&b=c"]);
    }

    #[test]
    fn name_is_not_decoded() {
        // Names are kept exactly as submitted; only values are decoded.
        let qs = parse_qs("first+name=Ann&last%20name=Lee");
        assert_eq!(values(&qs, "first+name"), vec!["Ann"]);
        assert_eq!(values(&qs, "last%20name"), vec!["Lee"]);
        assert!(!qs.contains("first name"));
        assert!(!qs.contains("last name"));
    }

    #[test]
    fn value_decoding_to_whitespace_is_kept() {
        let qs = parse_qs("a=+&b=%20");
        assert_eq!(values(&qs, "a"), vec![" "]);
        assert_eq!(values(&qs, "b"), vec![" "]);
    }

    #[test]
    fn pairs_keep_interleaved_order() {
        let pairs = parse_qsl("b=1&a=2&b=3&c=");
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "1".to_string()),
                ("a".to_string(), "2".to_string()),
                ("b".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn percent_decode_no_encoding() {
        let decoded = percent_decode("hello");
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(&*decoded, "hello");
    }

    #[test]
    fn percent_decode_invalid_hex() {
        // Invalid hex should be kept as-is
        assert_eq!(&*percent_decode("%ZZ"), "%ZZ");
        assert_eq!(&*percent_decode("%2"), "%2");
    }

    #[test]
    fn percent_decode_encoded_plus() {
        assert_eq!(&*percent_decode("1%2B1"), "1+1");
        assert_eq!(&*percent_decode("a+b%2Bc"), "a b+c");
    }

    #[test]
    fn percent_decode_invalid_utf8_is_replaced() {
        assert_eq!(&*percent_decode("%FF"), "\u{FFFD}");
    }

    proptest! {
        #[test]
        fn decoded_values_are_never_empty(qs in "[a-z=&%+0-9]{0,64}") {
            let parsed = parse_qs(&qs);
            for (_, vals) in parsed.iter() {
                prop_assert!(vals.iter().all(|v| !v.is_empty()));
            }
        }
    }
}
