use core::fmt;

/// Which plane of a raw frame a geometry check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    Luma,
    ChromaU,
    ChromaV,
}

impl fmt::Display for PlaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Luma => f.write_str("Y"),
            Self::ChromaU => f.write_str("U"),
            Self::ChromaV => f.write_str("V"),
        }
    }
}

/// A raw frame whose strides or buffer sizes contradict its dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GeometryError {
    EmptyFrame,
    MissingPlanes {
        found: usize,
    },
    StrideTooSmall {
        plane: PlaneKind,
        stride: usize,
        min: usize,
    },
    ZeroPixelStride {
        plane: PlaneKind,
    },
    LumaPixelStride {
        stride: usize,
    },
    PlaneTooShort {
        plane: PlaneKind,
        required: usize,
        available: usize,
    },
    /// The furthest offset implied by the strides does not fit in `usize`.
    StrideOverflow {
        plane: PlaneKind,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFrame => f.write_str("frame has a zero dimension"),
            Self::MissingPlanes { found } => write!(f, "expected 3 planes, found {found}"),
            Self::StrideTooSmall { plane, stride, min } => {
                write!(f, "{plane} row stride {stride} is smaller than {min}")
            }
            Self::ZeroPixelStride { plane } => write!(f, "{plane} pixel stride is zero"),
            Self::LumaPixelStride { stride } => {
                write!(f, "Y pixel stride must be 1, got {stride}")
            }
            Self::PlaneTooShort {
                plane,
                required,
                available,
            } => write!(
                f,
                "{plane} plane needs {required} bytes but only {available} are available"
            ),
            Self::StrideOverflow { plane } => {
                write!(f, "{plane} plane strides overflow the addressable range")
            }
        }
    }
}

impl core::error::Error for GeometryError {}

/// Platform-specific error details.
///
/// Render backends report shader, texture and context failures here. Use
/// [`Display`](fmt::Display) to obtain a human-readable description.
#[derive(Debug)]
#[non_exhaustive]
pub enum PlatformError {
    Message(String),
    #[cfg(feature = "gl")]
    Shader {
        stage: &'static str,
        log: String,
    },
    #[cfg(feature = "gl")]
    Link(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => f.write_str(msg),
            #[cfg(feature = "gl")]
            Self::Shader { stage, log } => write!(f, "{stage} shader failed to compile: {log}"),
            #[cfg(feature = "gl")]
            Self::Link(log) => write!(f, "program failed to link: {log}"),
        }
    }
}

impl core::error::Error for PlatformError {}

/// Top-level crate error.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Geometry(GeometryError),
    BufferSize { expected: usize, actual: usize },
    UnsupportedFormat,
    AlreadyStarted,
    NotStarted,
    Platform(PlatformError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(e) => write!(f, "frame geometry error: {e}"),
            Self::BufferSize { expected, actual } => {
                write!(f, "buffer holds {actual} bytes, expected {expected}")
            }
            Self::UnsupportedFormat => f.write_str("unsupported format"),
            Self::AlreadyStarted => f.write_str("stream already started"),
            Self::NotStarted => f.write_str("stream not started"),
            Self::Platform(e) => write!(f, "platform error: {e}"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            Self::Platform(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeometryError> for Error {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

impl From<PlatformError> for Error {
    fn from(e: PlatformError) -> Self {
        Self::Platform(e)
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use core::error::Error as _;

    #[test]
    fn geometry_error_is_the_source() {
        let err = Error::from(GeometryError::PlaneTooShort {
            plane: PlaneKind::ChromaV,
            required: 10,
            available: 4,
        });
        assert_eq!(
            err.to_string(),
            "frame geometry error: V plane needs 10 bytes but only 4 are available"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn buffer_size_has_no_source() {
        let err = Error::BufferSize {
            expected: 6,
            actual: 5,
        };
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "buffer holds 5 bytes, expected 6");
    }
}
