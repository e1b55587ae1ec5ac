//! Upgrade request target: path plus query string.

/// The path and query of an HTTP request line, e.g. `/api/player?id=k7m2p`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTarget {
    path: String,
    query: Option<String>,
}

impl RequestTarget {
    /// Creates a target from an already split path and query.
    pub fn new(path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    /// Splits a raw `path?query` string.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('?') {
            Some((path, query)) => Self::new(path, Some(query.to_owned())),
            None => Self::new(raw, None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the decoded value of the first `name` parameter.
    ///
    /// A parameter that is absent and one that is present but empty both
    /// yield `None`. Malformed escapes are kept literally.
    pub fn param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}
