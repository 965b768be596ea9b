//! Collection queries built from URL parameters.
//!
//! Query building is best effort. Every parameter is applied independently;
//! a malformed one is reported as a [`ParameterError`] and skipped, and the
//! rest of the query still takes effect. Callers log the errors and carry on
//! with whatever was built.
//!
//! The record limit handed to the datastore never exceeds the server ceiling
//! given to [`QueryBuilder::new`], whatever the client asked for.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::timestamp;

/// Errors produced while translating request parameters into a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    /// Parameter name not understood by this server.
    #[error("unsupported parameter: {0}")]
    Unsupported(String),

    /// Parameter present without a value.
    #[error("empty value for parameter {0}")]
    EmptyValue(String),

    /// Timestamp that is not RFC 3339.
    #[error("invalid timestamp for {parameter}: {value}")]
    InvalidTimestamp { parameter: String, value: String },

    /// `match[version]` value that is neither a keyword nor a timestamp.
    #[error("invalid version selector: {0}")]
    InvalidVersion(String),

    /// `limit` that is not a positive integer.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    /// `Range` header not of the form `items <begin>-<end>`.
    #[error("invalid range: {0}")]
    InvalidRange(String),
}

/// All parameter errors from one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterErrors(pub Vec<ParameterError>);

impl fmt::Display for ParameterErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParameterErrors {}

/// Which versions of each object a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    First,
    Last,
    All,
    At(DateTime<Utc>),
}

impl VersionSelector {
    /// Parse a single `match[version]` value.
    pub fn parse(value: &str) -> Result<Self, ParameterError> {
        match value.trim() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "all" => Ok(Self::All),
            other => timestamp::parse(other)
                .map(Self::At)
                .map_err(|_| ParameterError::InvalidVersion(other.to_string())),
        }
    }
}

/// An inclusive item range, as carried by `Range: items 0-49`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRange {
    pub begin: usize,
    pub end: usize,
}

impl ItemRange {
    /// Parse a `Range` header value.
    pub fn parse(header: &str) -> Result<Self, ParameterError> {
        let invalid = || ParameterError::InvalidRange(header.to_string());

        let items = header.trim().strip_prefix("items ").ok_or_else(invalid)?;
        let (begin, end) = items.trim().split_once('-').ok_or_else(invalid)?;
        let begin: usize = begin.trim().parse().map_err(|_| invalid())?;
        let end: usize = end.trim().parse().map_err(|_| invalid())?;
        if begin > end {
            return Err(invalid());
        }
        Ok(Self { begin, end })
    }

    /// Number of items the range covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.begin + 1
    }
}

/// A bounded query against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection_id: String,
    /// Server-enforced maximum number of records.
    pub server_record_limit: usize,
    /// Limit requested by the client, if any. Never trusted on its own.
    pub client_record_limit: Option<usize>,
    pub object_ids: Vec<String>,
    pub object_types: Vec<String>,
    pub versions: Vec<VersionSelector>,
    pub added_after: Option<DateTime<Utc>>,
    pub range: Option<ItemRange>,
}

impl CollectionQuery {
    /// Default query: whole collection, latest versions, server limit.
    #[must_use]
    pub fn new(collection_id: impl Into<String>, server_record_limit: usize) -> Self {
        Self {
            collection_id: collection_id.into(),
            server_record_limit,
            client_record_limit: None,
            object_ids: Vec::new(),
            object_types: Vec::new(),
            versions: Vec::new(),
            added_after: None,
            range: None,
        }
    }

    /// Number of records the datastore may return.
    ///
    /// The smallest of the server ceiling, the client `limit` and the range
    /// length.
    #[must_use]
    pub fn record_limit(&self) -> usize {
        let mut limit = self.server_record_limit;
        if let Some(client) = self.client_record_limit {
            limit = limit.min(client);
        }
        if let Some(range) = self.range {
            limit = limit.min(range.len());
        }
        limit
    }

    /// Index of the first record to return.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.range.map(|r| r.begin).unwrap_or(0)
    }

    /// Version selectors in effect; `last` when none were given.
    #[must_use]
    pub fn version_selectors(&self) -> Vec<VersionSelector> {
        if self.versions.is_empty() {
            vec![VersionSelector::Last]
        } else {
            self.versions.clone()
        }
    }
}

/// Builds a [`CollectionQuery`] from request parameters.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: CollectionQuery,
}

impl QueryBuilder {
    #[must_use]
    pub fn new(collection_id: impl Into<String>, server_record_limit: usize) -> Self {
        Self {
            query: CollectionQuery::new(collection_id, server_record_limit),
        }
    }

    /// Apply URL query parameters.
    ///
    /// Every parameter that parses is applied even when others fail.
    pub fn apply_params<K, V>(&mut self, params: &[(K, V)]) -> Result<(), ParameterErrors>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let errors: Vec<ParameterError> = params
            .iter()
            .filter_map(|(name, value)| self.apply_param(name.as_ref(), value.as_ref()).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ParameterErrors(errors))
        }
    }

    /// Apply a `Range` request header.
    pub fn apply_range_header(&mut self, header: &str) -> Result<(), ParameterError> {
        self.query.range = Some(ItemRange::parse(header)?);
        Ok(())
    }

    fn apply_param(&mut self, name: &str, value: &str) -> Result<(), ParameterError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ParameterError::EmptyValue(name.to_string()));
        }

        match name {
            "match[id]" => self.query.object_ids.extend(split_list(value)),
            "match[type]" => self.query.object_types.extend(split_list(value)),
            "match[version]" => {
                let selectors = split_list(value)
                    .map(|v| VersionSelector::parse(&v))
                    .collect::<Result<Vec<_>, _>>()?;
                self.query.versions.extend(selectors);
            }
            "added_after" | "added-after" => {
                let ts = timestamp::parse(value).map_err(|_| ParameterError::InvalidTimestamp {
                    parameter: name.to_string(),
                    value: value.to_string(),
                })?;
                self.query.added_after = Some(ts);
            }
            "limit" => {
                let limit: usize = value
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ParameterError::InvalidLimit(value.to_string()))?;
                self.query.client_record_limit = Some(limit);
            }
            other => return Err(ParameterError::Unsupported(other.to_string())),
        }
        Ok(())
    }

    #[must_use]
    pub fn build(self) -> CollectionQuery {
        self.query
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
