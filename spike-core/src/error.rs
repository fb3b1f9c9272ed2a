use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A batch, tensor or label vector has an empty or inconsistent shape.
    InvalidShape(String),
    /// An encoder or scorer parameter is out of range.
    InvalidParameter(String),
    /// Two containers that must agree along one axis do not.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl CoreError {
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        CoreError::InvalidShape(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        CoreError::InvalidParameter(msg.into())
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidShape(msg) => write!(f, "invalid shape: {}", msg),
            CoreError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            CoreError::ShapeMismatch { what, expected, actual } => {
                write!(f, "shape mismatch: expected {} {}, got {}", expected, what, actual)
            }
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T, E = CoreError> = core::result::Result<T, E>;
