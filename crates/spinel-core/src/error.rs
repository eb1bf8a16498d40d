use thiserror::Error;

/// Errors that can occur while loading or batching triple datasets.
#[derive(Error, Debug)]
pub enum DataError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A line in a split file is not a tab-separated triple.
    #[error("malformed triple at {path}:{line}: {text:?}")]
    MalformedTriple {
        /// File the line came from.
        path: String,
        /// 1-based line number.
        line: usize,
        /// The offending line.
        text: String,
    },
    /// A split file contained no triples.
    #[error("split {0} contains no triples")]
    EmptySplit(String),
}

/// Result type alias for spinel-core.
pub type Result<T> = std::result::Result<T, DataError>;
