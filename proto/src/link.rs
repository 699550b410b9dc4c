// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Deep link request / reply encoding
//!
//! ## Encoding:
//! ```text
//! <base>/<method>[?<key>=<value>[&<key>=<value>...]]
//! ```
//!
//! Values are written and read verbatim. Senders must percent-escape any
//! value that may contain `?`, `&`, `=` or other reserved characters
//! (in practice `app_url` and `redirect_link`), all other protocol values
//! are base-58 or fixed identifiers.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use crate::Error;

const SCHEME_SEPARATOR: &str = "://";

/// Deep link method and parameters, used for both requests and replies
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DeepLink {
    /// Method identifier (request method or reply callback)
    pub method: String,
    /// Query parameters
    pub params: BTreeMap<String, String>,
}

impl DeepLink {
    /// Create a new link with no parameters
    pub fn new(method: impl ToString) -> Self {
        Self {
            method: method.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter to the link
    pub fn with_param(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Check the link can be encoded, requiring a non-empty method
    /// without path or query separators
    pub fn is_valid(&self) -> bool {
        !self.method.is_empty() && !self.method.contains(&['/', '?', '&', '='][..])
    }

    /// Fetch a parameter by key
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|v| v.as_str())
    }

    /// Encode link as a URL under the provided base
    ///
    /// The method must be non-empty, see [DeepLink::is_valid].
    pub fn to_url(&self, base: &str) -> String {
        debug_assert!(!self.method.is_empty(), "deep link method must not be empty");

        let mut url = format!("{}/{}", base.trim_end_matches('/'), self.method);

        if !self.params.is_empty() {
            let query: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();

            url.push('?');
            url.push_str(&query.join("&"));
        }

        url
    }

    /// Decode a link from a URL
    ///
    /// The method is the final path segment following the scheme
    /// separator, so `app://onTxSigned?..` and
    /// `https://phantom.app/ul/v1/signTransaction?..` both decode to
    /// their respective method identifiers.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let (_scheme, body) = url
            .split_once(SCHEME_SEPARATOR)
            .ok_or(Error::MissingScheme)?;

        let (path, query) = match body.split_once('?') {
            Some((p, q)) => (p, q),
            None => (body, ""),
        };

        let method = match path.trim_end_matches('/').rsplit('/').next() {
            Some(m) if !m.is_empty() => m,
            _ => return Err(Error::EmptyMethod),
        };

        let mut params = BTreeMap::new();

        if !query.is_empty() {
            for pair in query.split('&') {
                let mut parts = pair.split('=');

                let (key, value) = match (parts.next(), parts.next(), parts.next()) {
                    (Some(k), Some(v), None) if !k.is_empty() => (k, v),
                    _ => return Err(Error::MalformedParam(pair.to_string())),
                };

                if params.insert(key.to_string(), value.to_string()).is_some() {
                    return Err(Error::DuplicateParam(key.to_string()));
                }
            }
        }

        Ok(Self {
            method: method.to_string(),
            params,
        })
    }
}

impl FromStr for DeepLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for DeepLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "method: {}", self.method)?;
        for (k, v) in &self.params {
            write!(f, "\n  {k}: {v}")?;
        }
        Ok(())
    }
}
