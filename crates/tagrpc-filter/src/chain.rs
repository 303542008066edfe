use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::filter::Filter;

/// Apply each filter's encode step in list order, left to right.
///
/// The first failing stage aborts the chain; its error records the stage's
/// position in the list.
pub fn encode_chain(filters: &[Filter], input: Bytes) -> Result<Bytes> {
    filters
        .iter()
        .enumerate()
        .try_fold(input, |bytes, (position, filter)| {
            filter.encode(bytes).map_err(|err| err.at(position))
        })
}

/// Apply each filter's decode step in list order, left to right.
///
/// Round-tripping requires this list to mirror the peer's encode list; a
/// mismatch surfaces as a decode error or as silently different bytes.
pub fn decode_chain(filters: &[Filter], input: Bytes) -> Result<Bytes> {
    filters
        .iter()
        .enumerate()
        .try_fold(input, |bytes, (position, filter)| {
            filter.decode(bytes).map_err(|err| err.at(position))
        })
}

/// An ordered list of filter stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    /// An empty chain (bytes pass through unchanged).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    /// Append a stage, builder style.
    pub fn with(mut self, filter: Filter) -> Self {
        self.push(filter);
        self
    }

    /// Run every stage's encode step.
    pub fn encode(&self, input: Bytes) -> Result<Bytes> {
        encode_chain(&self.filters, input)
    }

    /// Run every stage's decode step.
    pub fn decode(&self, input: Bytes) -> Result<Bytes> {
        decode_chain(&self.filters, input)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(Filter::name).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl From<Vec<Filter>> for FilterChain {
    fn from(filters: Vec<Filter>) -> Self {
        Self { filters }
    }
}

impl FromIterator<Filter> for FilterChain {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FilterChain {
    type Item = Filter;
    type IntoIter = std::vec::IntoIter<Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.into_iter()
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filters.is_empty() {
            return write!(f, "(none)");
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}
