use core::fmt;

/// Result alias for `lagem`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the lag estimators.
///
/// Numerical divergence during a fit is not an error; it is reported through
/// [`FitStatus`](crate::em::FitStatus).
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// One of the input sequences was empty.
    EmptyInput,

    /// A declared sequence size exceeds the data supplied.
    LengthMismatch {
        /// Which sequence ("a" or "b").
        sequence: &'static str,
        /// Size declared by the caller.
        declared: usize,
        /// Number of elements actually available.
        actual: usize,
    },

    /// An observation is NaN or infinite.
    NonFiniteValue {
        /// Which sequence ("a" or "b").
        sequence: &'static str,
        /// Position of the offending value.
        index: usize,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::LengthMismatch {
                sequence,
                declared,
                actual,
            } => {
                write!(
                    f,
                    "sequence '{sequence}' declared with {declared} elements, only {actual} available"
                )
            }
            Error::NonFiniteValue { sequence, index } => {
                write!(f, "non-finite value in sequence '{sequence}' at index {index}")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
