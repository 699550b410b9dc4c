// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Deep link decoding errors
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Error {
    /// Link has no `://` scheme separator
    #[error("missing scheme separator in link")]
    MissingScheme,

    /// Link path has no method segment
    #[error("empty method identifier")]
    EmptyMethod,

    /// Query parameter is not a single `key=value` pair
    #[error("malformed query parameter '{0}'")]
    MalformedParam(String),

    /// Query parameter key repeated
    #[error("duplicate query parameter '{0}'")]
    DuplicateParam(String),
}
