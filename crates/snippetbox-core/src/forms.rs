//! HTML form parsing and validation.
//!
//! A [`Form`] holds the submitted values and the errors found while
//! validating them. Handlers run the checks they need, then either act on
//! the values or re-render the page with the form attached so the template
//! can show both the old input and the messages.
//!
//! ```
//! use snippetbox_core::Form;
//!
//! let mut form = Form::parse(b"title=&content=hello&expires=30").unwrap();
//! form.required(&["title", "content", "expires"]);
//! form.permitted_values("expires", &["365", "7", "1"]);
//!
//! assert!(!form.valid());
//! assert_eq!(form.errors.get("title"), Some("This field cannot be blank"));
//! assert_eq!(form.errors.get("expires"), Some("This field is invalid"));
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Validation messages keyed by field name.
///
/// Serializes as a map from field name to its first message, which is what
/// templates show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// Records `message` against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns the first message recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FormErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            if let Some(first) = messages.first() {
                map.serialize_entry(field, first)?;
            }
        }
        map.end()
    }
}

/// Submitted form values plus their validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Form {
    /// Submitted values; a repeated field keeps its last value
    pub values: BTreeMap<String, String>,
    /// Errors found so far
    pub errors: FormErrors,
}

/// Shared pattern for email fields.
pub fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email pattern is a valid regex")
    })
}

impl Form {
    /// Creates a form from already-decoded values.
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            errors: FormErrors::default(),
        }
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    ///
    /// A `%` not followed by two hex digits is an error rather than being
    /// passed through literally.
    pub fn parse(body: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        if let Some(at) = bad_escape(body) {
            return Err(serde::de::Error::custom(format!(
                "invalid percent escape at byte {at}"
            )));
        }
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
        Ok(Self::new(pairs))
    }

    /// Returns the submitted value for `field`, or `""`.
    #[must_use]
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map_or("", String::as_str)
    }

    /// Flags every listed field that is missing or only whitespace.
    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).trim().is_empty() {
                self.errors.add(*field, "This field cannot be blank");
            }
        }
    }

    /// Flags `field` if it is longer than `max` characters.
    pub fn max_length(&mut self, field: &str, max: usize) {
        let value = self.get(field);
        if !value.is_empty() && value.chars().count() > max {
            self.errors.add(
                field,
                format!("This field is too long (maximum is {max} characters)"),
            );
        }
    }

    /// Flags `field` if it is shorter than `min` characters.
    pub fn min_length(&mut self, field: &str, min: usize) {
        let value = self.get(field);
        if !value.is_empty() && value.chars().count() < min {
            self.errors.add(
                field,
                format!("This field is too short (minimum is {min} characters)"),
            );
        }
    }

    /// Flags `field` unless its value is one of `permitted`.
    pub fn permitted_values(&mut self, field: &str, permitted: &[&str]) {
        let value = self.get(field);
        if !value.is_empty() && !permitted.contains(&value) {
            self.errors.add(field, "This field is invalid");
        }
    }

    /// Flags `field` unless it matches `pattern`.
    pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) {
        let value = self.get(field);
        if !value.is_empty() && !pattern.is_match(value) {
            self.errors.add(field, "This field is invalid");
        }
    }

    /// Returns true if no check has failed.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}


fn bad_escape(body: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < body.len() {
        if body[i] == b'%' {
            match body.get(i + 1..i + 3) {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => {}
                _ => return Some(i),
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    None
}
