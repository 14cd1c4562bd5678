//! In-memory raster provider.
//!
//! Rasters live in a path-keyed store shared by every clone of the provider, so a caller can
//! seed inputs, run the engine, and inspect what was written (including bands that were never
//! written because the run stopped early).

use crate::creation::CreationOptions;
use crate::error::{KernelFilterError, Result};
use crate::provider::{RasterProvider, RasterSink, RasterSource};
use crate::raster::{Band, ColorInterpretation, GeoTransform, OutputBand, RasterMetadata};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    pub metadata: RasterMetadata,
    /// `None` marks a band that was created but never written
    pub bands: Vec<Option<Band>>,
    pub creation: CreationOptions,
    pub closed: bool,
}

impl MemoryRaster {
    /// Build an input raster from fully populated bands
    pub fn new(geotransform: Option<GeoTransform>, projection: &str, bands: Vec<Band>) -> Result<Self> {
        let (height, width) = bands.first().map(|b| b.data.dim()).unwrap_or((0, 0));
        for (i, band) in bands.iter().enumerate() {
            let (rows, cols) = band.data.dim();
            if (rows, cols) != (height, width) {
                return Err(KernelFilterError::BandShapeMismatch {
                    band: i + 1,
                    width,
                    height,
                    actual_width: cols,
                    actual_height: rows,
                });
            }
        }

        Ok(Self {
            metadata: RasterMetadata {
                width,
                height,
                band_count: bands.len(),
                geotransform,
                projection: projection.to_string(),
            },
            bands: bands.into_iter().map(Some).collect(),
            creation: CreationOptions::default(),
            closed: true,
        })
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index.checked_sub(1)?)?.as_ref()
    }

    pub fn written_bands(&self) -> usize {
        self.bands.iter().filter(|b| b.is_some()).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    store: Rc<RefCell<HashMap<PathBuf, MemoryRaster>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&self, path: P, raster: MemoryRaster) {
        self.store.borrow_mut().insert(path.into(), raster);
    }

    /// Snapshot of the raster stored at `path`
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<MemoryRaster> {
        self.store.borrow().get(path.as_ref()).cloned()
    }
}

pub struct MemorySource {
    raster: MemoryRaster,
}

impl RasterSource for MemorySource {
    fn metadata(&self) -> &RasterMetadata {
        &self.raster.metadata
    }

    fn read_band(&self, index: usize) -> Result<Band> {
        self.raster
            .band(index)
            .cloned()
            .ok_or(KernelFilterError::BandIndex(index, self.raster.metadata.band_count))
    }
}

pub struct MemorySink {
    path: PathBuf,
    store: Rc<RefCell<HashMap<PathBuf, MemoryRaster>>>,
}

impl RasterSink for MemorySink {
    fn write_band(&mut self, index: usize, band: &OutputBand) -> Result<()> {
        let mut store = self.store.borrow_mut();
        let raster = store
            .get_mut(&self.path)
            .ok_or_else(|| KernelFilterError::MissingInput(self.path.display().to_string()))?;

        let band_count = raster.metadata.band_count;
        let slot = index
            .checked_sub(1)
            .and_then(|i| raster.bands.get_mut(i))
            .ok_or(KernelFilterError::BandIndex(index, band_count))?;

        *slot = Some(Band {
            data: band.data.mapv(f64::from),
            nodata: band.nodata,
            color: band.color,
        });
        debug!("Stored band {} in {}", index, self.path.display());
        Ok(())
    }

    fn close(self) -> Result<()> {
        if let Some(raster) = self.store.borrow_mut().get_mut(&self.path) {
            raster.closed = true;
        }
        Ok(())
    }
}

impl RasterProvider for MemoryProvider {
    type Source = MemorySource;
    type Sink = MemorySink;

    fn exists(&self, path: &Path) -> bool {
        self.store.borrow().contains_key(path)
    }

    fn open(&self, path: &Path) -> Result<MemorySource> {
        let raster = self.get(path).ok_or_else(|| KernelFilterError::RasterOpen {
            path: path.display().to_string(),
            reason: "no such raster in memory store".to_string(),
        })?;
        Ok(MemorySource { raster })
    }

    fn create(&self, path: &Path, metadata: &RasterMetadata, options: &CreationOptions) -> Result<MemorySink> {
        let raster = MemoryRaster {
            metadata: metadata.clone(),
            bands: vec![None; metadata.band_count],
            creation: options.clone(),
            closed: false,
        };
        self.insert(path, raster);
        Ok(MemorySink {
            path: path.to_path_buf(),
            store: Rc::clone(&self.store),
        })
    }
}

/// Single band with no nodata and undefined color, handy for fixtures
pub fn plain_band(data: ndarray::Array2<f64>) -> Band {
    Band {
        data,
        nodata: None,
        color: ColorInterpretation::Undefined,
    }
}
