use thiserror::Error;

/// Failures raised by the session itself, independent of any backend.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("out of memory")]
    NoMemory,
    #[error("stream not initialized")]
    NotInitialized,
    #[error("stream contains no video")]
    NoVideoStream,
    #[error("unknown or unsupported decoder")]
    UnknownDecoder,
    #[error("scaling/pixel format conversion is not possible")]
    InvalidScaler,
}

/// Error returned by every decode-session operation.
///
/// Local failures and backend failures never share a numeric space: a
/// backend code is carried verbatim together with the backend's message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error(transparent)]
    Local(#[from] ErrorKind),
    #[error("backend error {code}: {message}")]
    Backend { code: i32, message: String },
}

impl DecodeError {
    pub fn backend(code: i32, message: impl Into<String>) -> Self {
        DecodeError::Backend {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DecodeError::Local(kind) => Some(*kind),
            DecodeError::Backend { .. } => None,
        }
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, DecodeError::Backend { .. })
    }
}
