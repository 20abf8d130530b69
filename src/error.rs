use thiserror::Error as ThisError;

/// Result alias for `ibd-dendrogram`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by matrix construction, clustering, and file I/O.
///
/// Construction and clustering fail fast: an `Err` means no matrix or tree
/// was produced at all.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A numeric input broke an invariant (non-positive threshold or segment
    /// length, malformed matrix, mismatched tree and index).
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Which input violated which invariant.
        reason: String,
    },

    /// Too few identities to cluster.
    #[error("insufficient data: found {found} identities, need at least {required}")]
    InsufficientData {
        /// Number of identities supplied.
        found: usize,
        /// Minimum required.
        required: usize,
    },

    /// A delimited file could not be interpreted.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The delimited-table reader failed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// True for [`Error::InvalidInput`].
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput { .. })
    }

    /// True for [`Error::InsufficientData`].
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Error::InsufficientData { .. })
    }
}
