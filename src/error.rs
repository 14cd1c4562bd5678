use std::path::PathBuf;
use thiserror::Error;

/// Problems found while reading or shaping a kernel file.
#[derive(Error, Debug)]
pub enum KernelFormatError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is empty or contains no valid numbers.")]
    Empty,

    #[error("invalid number {token:?}: {source}")]
    InvalidValue {
        token: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("Kernel must be square (e.g., 3x3=9, 5x5=25). Found {0} values.")]
    NotSquare(usize),
}

#[derive(Error, Debug)]
pub enum KernelFilterError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Error reading kernel file: {0}")]
    KernelFormat(#[from] KernelFormatError),

    #[error("Cannot open raster {path}: {reason}")]
    RasterOpen { path: String, reason: String },

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Input raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Band {band} is {actual_width}x{actual_height}, raster is {width}x{height}")]
    BandShapeMismatch {
        band: usize,
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("Band {0} does not exist (raster has {1} bands)")]
    BandIndex(usize, usize),

    #[error("Invalid compression type: {0}")]
    InvalidCompression(String),

    #[error("Invalid tile size: {0} (must be multiple of 16)")]
    InvalidTileSize(usize),
}

/// Coarse classification of a [`KernelFilterError`].
///
/// `MissingInput`, `KernelFormat` and `RasterOpen` are pre-flight failures raised before the
/// output exists; everything else happens inside the band loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingInput,
    KernelFormat,
    RasterOpen,
    Processing,
}

impl KernelFilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelFilterError::MissingInput(_)
            | KernelFilterError::InvalidCompression(_)
            | KernelFilterError::InvalidTileSize(_) => ErrorKind::MissingInput,
            KernelFilterError::KernelFormat(_) => ErrorKind::KernelFormat,
            KernelFilterError::RasterOpen { .. } => ErrorKind::RasterOpen,
            _ => ErrorKind::Processing,
        }
    }

    pub fn is_preflight(&self) -> bool {
        self.kind() != ErrorKind::Processing
    }
}

pub type Result<T> = std::result::Result<T, KernelFilterError>;
