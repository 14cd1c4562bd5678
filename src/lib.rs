// Library exports for embedding and testing

pub mod cli;
pub mod convolve;
pub mod creation;
pub mod engine;
pub mod error;
pub mod feedback;
#[cfg(feature = "gdal")]
pub mod gdal_io;
pub mod kernel;
pub mod memory;
pub mod provider;
pub mod raster;

// Re-export commonly used types
pub use creation::CreationOptions;
pub use engine::{execute, run_convolution, FilterRequest, RunOutcome};
pub use error::{ErrorKind, KernelFilterError, KernelFormatError, Result};
pub use feedback::{CancelToken, Feedback, LogFeedback};
#[cfg(feature = "gdal")]
pub use gdal_io::GdalProvider;
pub use kernel::Kernel;
pub use provider::{RasterProvider, RasterSink, RasterSource};
