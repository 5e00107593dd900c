//! Request cookies in, `Set-Cookie` out.

use std::collections::HashMap;
use std::fmt;

use http::{header, HeaderMap};

/// Name/value pairs from every `Cookie` request header.
///
/// A repeated name keeps its first value, which browsers send for the most
/// specific path.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    jar: HashMap<String, String>,
}

impl Cookies {
    /// Collects the cookies of a request. Non-UTF-8 headers are ignored.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut jar = HashMap::new();
        let pairs = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.split_once('='));

        for (name, value) in pairs {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            jar.entry(name.to_owned()).or_insert_with(|| value.to_owned());
        }
        Self { jar }
    }

    /// Value sent for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.jar.get(name).map(String::as_str)
    }

    /// True when the request carried no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jar.is_empty()
    }
}

/// `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// `SameSite=None`
    None,
    /// `SameSite=Lax`
    #[default]
    Lax,
    /// `SameSite=Strict`
    Strict,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Lax => "Lax",
            Self::Strict => "Strict",
        }
    }
}

/// An outgoing cookie.
///
/// ```
/// use snippetbox_session::{SameSite, SetCookie};
///
/// let cookie = SetCookie::new("session", "abc")
///     .path("/")
///     .http_only(true)
///     .secure(true)
///     .same_site(SameSite::Lax)
///     .max_age_secs(43200);
///
/// assert_eq!(
///     cookie.to_header_value(),
///     "session=abc; Path=/; Max-Age=43200; Secure; HttpOnly; SameSite=Lax"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    path: Option<String>,
    max_age_secs: Option<u64>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// Bare `name=value` with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            max_age_secs: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Empty value with `Max-Age=0`, which makes the browser drop `name`.
    #[must_use]
    pub fn remove(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age_secs(0)
    }

    /// `Path` attribute.
    #[must_use]
    pub fn path(self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self
        }
    }

    /// `Max-Age` attribute.
    #[must_use]
    pub fn max_age_secs(self, seconds: u64) -> Self {
        Self {
            max_age_secs: Some(seconds),
            ..self
        }
    }

    /// `Secure` flag.
    #[must_use]
    pub fn secure(self, secure: bool) -> Self {
        Self { secure, ..self }
    }

    /// `HttpOnly` flag.
    #[must_use]
    pub fn http_only(self, http_only: bool) -> Self {
        Self { http_only, ..self }
    }

    /// `SameSite` attribute.
    #[must_use]
    pub fn same_site(self, same_site: SameSite) -> Self {
        Self {
            same_site: Some(same_site),
            ..self
        }
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The `Set-Cookie` header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(secs) = self.max_age_secs {
            write!(f, "; Max-Age={secs}")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn jar(lines: &[&'static str]) -> Cookies {
        let mut headers = HeaderMap::new();
        for line in lines {
            headers.append(header::COOKIE, HeaderValue::from_static(line));
        }
        Cookies::from_headers(&headers)
    }

    #[test]
    fn reads_every_pair() {
        let cookies = jar(&["session=s1; csrf_token=t1; theme=dark"]);
        assert_eq!(cookies.get("session"), Some("s1"));
        assert_eq!(cookies.get("csrf_token"), Some("t1"));
        assert_eq!(cookies.get("theme"), Some("dark"));
    }

    #[test]
    fn trims_whitespace_and_quotes() {
        let cookies = jar(&["  session  =  \"s1\"  ;=orphan; flag"]);
        assert_eq!(cookies.get("session"), Some("s1"));
        assert_eq!(cookies.get(""), None);
        assert_eq!(cookies.get("flag"), None);
    }

    #[test]
    fn first_value_for_a_name_wins() {
        let cookies = jar(&["session=first", "session=second"]);
        assert_eq!(cookies.get("session"), Some("first"));
    }

    #[test]
    fn no_header_means_no_cookies() {
        assert!(jar(&[]).is_empty());
    }

    #[test]
    fn removal_cookie() {
        let cookie = SetCookie::remove("session").path("/");
        assert_eq!(cookie.to_header_value(), "session=; Path=/; Max-Age=0");
    }

    #[test]
    fn bare_cookie_has_no_attributes() {
        assert_eq!(SetCookie::new("k", "v").to_string(), "k=v");
    }
}
