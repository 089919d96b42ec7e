#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error reading a delimited lookup table.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Upstream payload is not valid JSON.
    #[error("payload decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Upstream payload is valid JSON but not a list of line records.
    #[error("unexpected payload shape: {0}")]
    PayloadShape(String),

    /// Output line does not have the fixed record width.
    #[error("line {line} has {actual} characters; expected {expected}")]
    LineLength {
        /// 1-based line position in the document
        line: usize,
        actual: usize,
        expected: usize,
    },

    /// Output line carries a sequence number out of order.
    #[error("line {line} carries sequence number {found:?}; expected {expected}")]
    Sequence {
        /// 1-based line position in the document
        line: usize,
        found: Option<usize>,
        expected: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
