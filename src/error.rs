// Error types. Every variant states *where* things went wrong.
use std::fmt::{self, Display};
use std::path::PathBuf;

/// Which header line of a pixmap was being read when the format check failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderStage {
    Magic,
    Dimensions,
    MaxValue,
}

impl Display for HeaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderStage::Magic => write!(f, "can only handle P6 as pixmap type"),
            HeaderStage::Dimensions => write!(f, "width/height expected"),
            HeaderStage::MaxValue => write!(f, "only 255 for maxval allowed"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("pixmap '{}' doesn't exist", .0.display())]
    NotFound(PathBuf),

    #[error("format error: {stage} |{line}")]
    Format { stage: HeaderStage, line: String },

    #[error("not enough pixels read: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn format(stage: HeaderStage, line: impl Into<String>) -> Self {
        Self::Format {
            stage,
            line: line.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("availability file '{}': {source}", .path.display())]
    Availability {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("camera init error: {0}")]
    CameraInit(String),

    #[error("camera frame error: {0}")]
    CameraFrame(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("panel spec '{0}' must look like NAME=PATH[,PATH...][@OFFSET]")]
    PanelSyntax(String),

    #[error("panel spec '{spec}' has a bad offset '{offset}'")]
    PanelOffset { spec: String, offset: String },
}
