//! Dictionary-style access to a flat form.

use std::io::BufRead;

use formstore_http::FieldMap;

use crate::config::FormConfig;
use crate::error::FormError;
use crate::legacy::{FormValue, parse_flat};
use crate::request::FormRequest;

/// A value read with numeric interpretation, see
/// [`FormContent::interpreted`].
#[derive(Debug, Clone, PartialEq)]
pub enum Interpreted {
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// Anything else, with surrounding whitespace removed.
    Text(String),
}

impl Interpreted {
    /// Interpret `text` as a number when it looks like one.
    ///
    /// Only text starting with a digit or one of `+-.` is tried as a
    /// number.
    ///
    /// ```
    /// use formstore_core::Interpreted;
    ///
    /// assert_eq!(Interpreted::from_text("42"), Interpreted::Int(42));
    /// assert_eq!(Interpreted::from_text("-1.5"), Interpreted::Float(-1.5));
    /// assert_eq!(Interpreted::from_text(" 7 "), Interpreted::Text("7".into()));
    /// assert_eq!(Interpreted::from_text("1x"), Interpreted::Text("1x".into()));
    /// ```
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let numeric = text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || "+-.".contains(c));
        let trimmed = text.trim();
        if numeric {
            if let Ok(int) = trimmed.parse::<i64>() {
                return Self::Int(int);
            }
            if let Ok(float) = trimmed.parse::<f64>() {
                return Self::Float(float);
            }
        }
        Self::Text(trimmed.to_string())
    }
}

/// A flat form together with the query string that produced it.
///
/// ```
/// use formstore_core::{FormConfig, FormContent, FormRequest};
///
/// let form = FormContent::parse(FormRequest::query("n=3&tag=a&tag=b"), &FormConfig::default())
///     .unwrap();
/// assert_eq!(form.value("n").map(|v| v.to_text().into_owned()).as_deref(), Some("3"));
/// assert!(form.single("tag").is_err());
/// assert_eq!(form.getlist("tag").len(), 2);
/// assert_eq!(form.query_string(), "n=3&tag=a&tag=b");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormContent {
    fields: FieldMap<FormValue>,
    query_string: String,
}

impl FormContent {
    /// Wrap an already parsed form.
    #[must_use]
    pub fn new(fields: FieldMap<FormValue>, query_string: impl Into<String>) -> Self {
        Self {
            fields,
            query_string: query_string.into(),
        }
    }

    /// Parse a request, see [`parse`](crate::parse).
    pub fn parse<R: BufRead>(
        request: FormRequest<R>,
        config: &FormConfig,
    ) -> Result<Self, FormError> {
        let (fields, query_string) = parse_flat(request, config)?;
        Ok(Self {
            fields,
            query_string,
        })
    }

    /// The query string the values were decoded from. Empty for multipart
    /// bodies submitted without one.
    #[must_use]
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// The underlying map.
    #[must_use]
    pub fn fields(&self) -> &FieldMap<FormValue> {
        &self.fields
    }

    /// Take the underlying map.
    #[must_use]
    pub fn into_fields(self) -> FieldMap<FormValue> {
        self.fields
    }

    /// Every value of `name`.
    pub fn get(&self, name: &str) -> Result<&[FormValue], FormError> {
        self.fields
            .get(name)
            .ok_or_else(|| FormError::KeyNotFound(name.to_string()))
    }

    /// Every value of `name`, empty when absent.
    #[must_use]
    pub fn getlist(&self, name: &str) -> &[FormValue] {
        self.fields.get(name).unwrap_or_default()
    }

    /// The only value of `name`.
    pub fn single(&self, name: &str) -> Result<&FormValue, FormError> {
        match self.get(name)? {
            [value] => Ok(value),
            values => Err(FormError::MultipleValues {
                name: name.to_string(),
                count: values.len(),
            }),
        }
    }

    /// Returns true if `name` has a value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    /// Field names in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys()
    }

    /// Value lists in name order.
    pub fn values(&self) -> impl Iterator<Item = &[FormValue]> {
        self.fields.iter().map(|(_, values)| values)
    }

    /// `(name, values)` pairs in name order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &[FormValue])> {
        self.fields.iter()
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field has a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The first value of `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FormValue> {
        self.fields.first(name)
    }

    /// The value of `name` at `index`.
    #[must_use]
    pub fn indexed_value(&self, name: &str, index: usize) -> Option<&FormValue> {
        self.getlist(name).get(index)
    }

    /// How many values `name` has.
    pub fn length(&self, name: &str) -> Result<usize, FormError> {
        self.get(name).map(<[FormValue]>::len)
    }

    /// The first value of `name` as text without surrounding whitespace.
    #[must_use]
    pub fn stripped(&self, name: &str) -> Option<String> {
        self.value(name).map(|v| v.to_text().trim().to_string())
    }

    /// The only value of `name`, read as a number when it looks like one.
    pub fn interpreted(&self, name: &str) -> Result<Interpreted, FormError> {
        self.single(name)
            .map(|value| Interpreted::from_text(&value.to_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    fn query(qs: &str) -> FormContent {
        FormContent::parse(FormRequest::query(qs), &FormConfig::default()).unwrap()
    }

    #[test]
    fn strict_single_value() {
        let form = query("a=1&b=2&b=3");
        assert_eq!(form.single("a").unwrap(), &FormValue::Text("1".into()));
        assert!(matches!(
            form.single("b"),
            Err(FormError::MultipleValues { count: 2, .. })
        ));
        assert!(matches!(form.single("c"), Err(FormError::KeyNotFound(_))));
    }

    #[test]
    fn positional_access() {
        let form = query("b=x&b=y");
        assert_eq!(form.length("b").unwrap(), 2);
        assert!(form.length("zz").is_err());
        assert_eq!(form.indexed_value("b", 1), Some(&FormValue::Text("y".into())));
        assert_eq!(form.indexed_value("b", 2), None);
        assert_eq!(form.indexed_value("zz", 0), None);
    }

    #[test]
    fn stripped_and_interpreted() {
        let form = query("s=+padded+&i=12&f=.5&t=abc&e=1e3");
        assert_eq!(form.stripped("s").as_deref(), Some("padded"));
        assert_eq!(form.stripped("missing"), None);
        assert_eq!(form.interpreted("i").unwrap(), Interpreted::Int(12));
        assert_eq!(form.interpreted("f").unwrap(), Interpreted::Float(0.5));
        assert_eq!(form.interpreted("t").unwrap(), Interpreted::Text("abc".into()));
        assert_eq!(form.interpreted("e").unwrap(), Interpreted::Float(1000.0));
    }

    #[test]
    fn leading_space_is_not_numeric() {
        // "+3" decodes to " 3": the first character is a space.
        let form = query("n=+3");
        assert_eq!(form.interpreted("n").unwrap(), Interpreted::Text("3".into()));
    }

    #[test]
    fn items_follow_first_seen_order() {
        let form = query("z=1&a=2&z=3");
        let names: Vec<_> = form.items().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(form.values().map(<[FormValue]>::len).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn urlencoded_post_records_body_as_query_string() {
        let request = FormRequest::new(Method::Post, &b"x=1"[..])
            .content_type("application/x-www-form-urlencoded");
        let form = FormContent::parse(request, &FormConfig::default()).unwrap();
        assert_eq!(form.query_string(), "x=1");
        assert!(form.has("x"));
    }
}
