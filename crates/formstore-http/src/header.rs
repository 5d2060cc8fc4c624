//! Structured header values such as `Content-Type` and `Content-Disposition`.
//!
//! The grammar accepted here is deliberately loose: the value is split on
//! every `;`, so a quoted parameter containing a semicolon is cut in two.
//! Browsers do not emit such values for form submissions and nothing here
//! ever fails; a segment that does not look like `key=value` is skipped.

/// Parameters of a structured header, in the order they first appeared.
///
/// Keys are stored lower-cased. A repeated key keeps its original position
/// and takes the later value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderParams {
    entries: Vec<(String, String)>,
}

impl HeaderParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing the value of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a parameter (case-insensitive).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the parameter is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a structured header value into its primary token and parameters.
///
/// The token is trimmed and lower-cased. Parameter keys are lower-cased;
/// values wrapped in a matching pair of double quotes lose the quotes.
///
/// # Example
///
/// ```
/// use formstore_http::parse_header;
///
/// let (token, params) = parse_header("multipart/form-data; boundary=\"XYZ\"; charset=utf-8");
/// assert_eq!(token, "multipart/form-data");
/// assert_eq!(params.get("boundary"), Some("XYZ"));
/// assert_eq!(params.get("charset"), Some("utf-8"));
/// ```
#[must_use]
pub fn parse_header(line: &str) -> (String, HeaderParams) {
    let mut segments = line.split(';').map(str::trim);
    let token = segments.next().unwrap_or_default().to_ascii_lowercase();

    let mut params = HeaderParams::new();
    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        params.insert(key.trim(), unquote(value.trim()));
    }
    (token, params)
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn content_type_with_quoted_boundary() {
        let (token, params) =
            parse_header("multipart/form-data; boundary=\"XYZ\"; charset=utf-8");
        assert_eq!(token, "multipart/form-data");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("boundary"), Some("XYZ"));
        assert_eq!(params.get("charset"), Some("utf-8"));
    }

    #[test]
    fn token_and_keys_are_lower_cased() {
        let (token, params) = parse_header("Form-Data; Name=\"field\"; FileName=\"a.TXT\"");
        assert_eq!(token, "form-data");
        assert_eq!(params.get("name"), Some("field"));
        assert_eq!(params.get("FILENAME"), Some("a.TXT"));
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "filename"]);
    }

    #[test]
    fn segments_without_equals_are_ignored() {
        let (token, params) = parse_header("text/plain; flowed; format=fixed");
        assert_eq!(token, "text/plain");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("format"), Some("fixed"));
        assert!(!params.contains("flowed"));
    }

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let (_, params) = parse_header("x; a=b=c");
        assert_eq!(params.get("a"), Some("b=c"));
    }

    #[test]
    fn lone_quote_is_not_stripped() {
        let (_, params) = parse_header("x; a=\"; b=\"\"");
        assert_eq!(params.get("a"), Some("\""));
        assert_eq!(params.get("b"), Some(""));
    }

    #[test]
    fn repeated_key_takes_later_value() {
        let (_, params) = parse_header("x; name=one; name=two");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("name"), Some("two"));
    }

    #[test]
    fn empty_line() {
        let (token, params) = parse_header("");
        assert_eq!(token, "");
        assert!(params.is_empty());
    }

    proptest! {
        #[test]
        fn never_panics(line in ".*") {
            let (token, params) = parse_header(&line);
            prop_assert_eq!(token.clone(), token.to_ascii_lowercase());
            for (key, _) in params.iter() {
                prop_assert_eq!(key.to_string(), key.to_ascii_lowercase());
            }
        }
    }
}
