//! Raster I/O capability the engine is written against.
//!
//! The engine never touches a file format directly: it opens a [`RasterSource`], creates a
//! [`RasterSink`] with the same grid, and moves bands between them one at a time.

use crate::creation::CreationOptions;
use crate::error::Result;
use crate::raster::{Band, OutputBand, RasterMetadata};
use std::path::Path;

pub trait RasterProvider {
    type Source: RasterSource;
    type Sink: RasterSink;

    /// Whether `path` names a raster this provider can see
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Open a raster read-only. Decoder failures map to `RasterOpen`.
    fn open(&self, path: &Path) -> Result<Self::Source>;

    /// Create a Float32 raster with the grid, band count, geotransform and projection of
    /// `metadata`.
    fn create(&self, path: &Path, metadata: &RasterMetadata, options: &CreationOptions) -> Result<Self::Sink>;
}

pub trait RasterSource {
    fn metadata(&self) -> &RasterMetadata;

    /// Read band `index` (1-based) in full
    fn read_band(&self, index: usize) -> Result<Band>;
}

pub trait RasterSink {
    /// Write band `index` (1-based) with its nodata and color interpretation
    fn write_band(&mut self, index: usize, band: &OutputBand) -> Result<()>;

    /// Flush everything written so far and release the dataset
    fn close(self) -> Result<()>;
}
