//! Graphics error types.

use thiserror::Error;

use crate::codec::DecodeError;
use crate::program::ShaderStage;

/// Error codes reported by the native graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiError {
    /// An enumeration parameter was not legal.
    InvalidEnum,
    /// A value parameter was not legal.
    InvalidValue,
    /// The operation was not legal in the current state.
    InvalidOperation,
    /// The framebuffer object was not complete.
    InvalidFramebufferOperation,
    /// Not enough memory to execute the command.
    OutOfMemory,
}

impl ApiError {
    /// The native error code for this error.
    pub fn code(self) -> u32 {
        match self {
            Self::InvalidEnum => 0x0500,
            Self::InvalidValue => 0x0501,
            Self::InvalidOperation => 0x0502,
            Self::OutOfMemory => 0x0505,
            Self::InvalidFramebufferOperation => 0x0506,
        }
    }

    /// Map a native error code; `None` for `NO_ERROR` or an unknown code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x0500 => Some(Self::InvalidEnum),
            0x0501 => Some(Self::InvalidValue),
            0x0502 => Some(Self::InvalidOperation),
            0x0505 => Some(Self::OutOfMemory),
            0x0506 => Some(Self::InvalidFramebufferOperation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidEnum => "INVALID_ENUM",
            Self::InvalidValue => "INVALID_VALUE",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::InvalidFramebufferOperation => "INVALID_FRAMEBUFFER_OPERATION",
            Self::OutOfMemory => "OUT_OF_MEMORY",
        };
        write!(f, "{name} (0x{:04X})", self.code())
    }
}

/// Errors that can occur in the graphics system.
///
/// Every variant is a hard error: the current operation is aborted and the
/// caller decides whether to abandon the frame or the process. Soft
/// conditions (a locked uniform table seeing a new name under the lenient
/// policy) are logged and counted instead of raised.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A named resource could not be located on disk.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A shader stage failed to compile; carries the native diagnostic log.
    #[error("{stage} shader compilation failed:\n{log}")]
    Compilation { stage: ShaderStage, log: String },

    /// The program failed to link; carries the native diagnostic log.
    #[error("program link failed:\n{0}")]
    Link(String),

    /// The program was used before a successful compile.
    #[error("shader program must be compiled before use")]
    NotCompiled,

    /// The resource was used after its native handles were released.
    #[error("resource is already disposed")]
    Disposed,

    /// The resource was used before its data was pushed to the GPU.
    #[error("resource data has not been uploaded")]
    NotUploaded,

    /// The operation is not legal in the resource's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The compiled program reports no active uniform with this name.
    #[error("cannot find uniform {0:?} in the material's program")]
    UniformNotFound(String),

    /// A locked uniform table rejected a new name under the strict policy.
    #[error("uniform names are locked and {0:?} is not a known name")]
    LockedUniform(String),

    /// The native graphics API flagged an error after an operation.
    #[error("graphics API error: {0}")]
    Api(ApiError),

    /// A persisted material payload could not be decoded.
    #[error("material decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// An IO error while reading or writing an asset.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_codes_round_trip() {
        for err in [
            ApiError::InvalidEnum,
            ApiError::InvalidValue,
            ApiError::InvalidOperation,
            ApiError::InvalidFramebufferOperation,
            ApiError::OutOfMemory,
        ] {
            assert_eq!(ApiError::from_code(err.code()), Some(err));
        }
        assert_eq!(ApiError::from_code(0), None);
    }

    #[test]
    fn error_display() {
        let err = RenderError::NotCompiled;
        assert_eq!(err.to_string(), "shader program must be compiled before use");

        let err = RenderError::UniformNotFound("u_Color".to_owned());
        assert!(err.to_string().contains("u_Color"));
    }
}
