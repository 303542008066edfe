/// Errors raised by a filter stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The input could not be decoded by the named stage.
    #[error("filter '{filter}' at position {position} rejected corrupt input: {detail}")]
    Corrupt {
        filter: &'static str,
        position: usize,
        detail: String,
    },

    /// Decoding would produce more than the stage's output limit.
    #[error("filter '{filter}' at position {position} exceeded output limit of {max} bytes")]
    OutputLimit {
        filter: &'static str,
        position: usize,
        max: usize,
    },

    /// Compression level outside 0..=10.
    #[error("invalid compression level {0} (expected 0-10)")]
    InvalidLevel(u8),

    /// A filter specification string could not be parsed.
    #[error("invalid filter spec: {0}")]
    Parse(String),
}

impl FilterError {
    pub(crate) fn at(self, position: usize) -> Self {
        match self {
            FilterError::Corrupt { filter, detail, .. } => FilterError::Corrupt {
                filter,
                position,
                detail,
            },
            FilterError::OutputLimit { filter, max, .. } => FilterError::OutputLimit {
                filter,
                position,
                max,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
