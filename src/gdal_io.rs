use crate::creation::CreationOptions;
use crate::error::{KernelFilterError, Result};
use crate::provider::{RasterProvider, RasterSink, RasterSource};
use crate::raster::{Band, ColorInterpretation, OutputBand, RasterMetadata};
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, ColorInterpretation as GdalColor, RasterBand};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use log::{debug, info, warn};
use ndarray::Array2;
use std::path::Path;

/// Raster provider backed by GDAL; output is always GeoTIFF
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalProvider;

pub struct GdalSource {
    dataset: Dataset,
    metadata: RasterMetadata,
}

pub struct GdalSink {
    dataset: Dataset,
    width: usize,
    height: usize,
}

fn from_gdal_color(color: GdalColor) -> ColorInterpretation {
    match color {
        GdalColor::GrayIndex => ColorInterpretation::Gray,
        GdalColor::PaletteIndex => ColorInterpretation::Palette,
        GdalColor::RedBand => ColorInterpretation::Red,
        GdalColor::GreenBand => ColorInterpretation::Green,
        GdalColor::BlueBand => ColorInterpretation::Blue,
        GdalColor::AlphaBand => ColorInterpretation::Alpha,
        GdalColor::HueBand => ColorInterpretation::Hue,
        GdalColor::SaturationBand => ColorInterpretation::Saturation,
        GdalColor::LightnessBand => ColorInterpretation::Lightness,
        GdalColor::CyanBand => ColorInterpretation::Cyan,
        GdalColor::MagentaBand => ColorInterpretation::Magenta,
        GdalColor::YellowBand => ColorInterpretation::Yellow,
        GdalColor::BlackBand => ColorInterpretation::Black,
        GdalColor::YCbCrSpaceYBand => ColorInterpretation::YCbCrY,
        GdalColor::YCbCrSpaceCbBand => ColorInterpretation::YCbCrCb,
        GdalColor::YCbCrSpaceCrBand => ColorInterpretation::YCbCrCr,
        _ => ColorInterpretation::Undefined,
    }
}

fn to_gdal_color(color: ColorInterpretation) -> GdalColor {
    match color {
        ColorInterpretation::Undefined => GdalColor::Undefined,
        ColorInterpretation::Gray => GdalColor::GrayIndex,
        ColorInterpretation::Palette => GdalColor::PaletteIndex,
        ColorInterpretation::Red => GdalColor::RedBand,
        ColorInterpretation::Green => GdalColor::GreenBand,
        ColorInterpretation::Blue => GdalColor::BlueBand,
        ColorInterpretation::Alpha => GdalColor::AlphaBand,
        ColorInterpretation::Hue => GdalColor::HueBand,
        ColorInterpretation::Saturation => GdalColor::SaturationBand,
        ColorInterpretation::Lightness => GdalColor::LightnessBand,
        ColorInterpretation::Cyan => GdalColor::CyanBand,
        ColorInterpretation::Magenta => GdalColor::MagentaBand,
        ColorInterpretation::Yellow => GdalColor::YellowBand,
        ColorInterpretation::Black => GdalColor::BlackBand,
        ColorInterpretation::YCbCrY => GdalColor::YCbCrSpaceYBand,
        ColorInterpretation::YCbCrCb => GdalColor::YCbCrSpaceCbBand,
        ColorInterpretation::YCbCrCr => GdalColor::YCbCrSpaceCrBand,
    }
}

/// Short label for the spatial reference, e.g. `EPSG:32633`
fn describe_projection(wkt: &str) -> String {
    if wkt.is_empty() {
        return "none".to_string();
    }
    match SpatialRef::from_wkt(wkt) {
        Ok(srs) => match (srs.auth_name(), srs.auth_code()) {
            (Ok(name), Ok(code)) => format!("{}:{}", name, code),
            _ => "custom".to_string(),
        },
        Err(e) => {
            warn!("Failed to parse projection WKT: {}", e);
            "unparsed".to_string()
        }
    }
}

/// Read grid, georeferencing and band count without touching pixel data
pub fn extract_metadata(dataset: &Dataset) -> Result<RasterMetadata> {
    let (width, height) = dataset.raster_size();
    let band_count = dataset.raster_count() as usize;

    if width == 0 || height == 0 {
        return Err(KernelFilterError::InvalidDimensions(width, height));
    }

    // A raster without georeferencing still gets filtered; the output just has none either
    let geotransform = match dataset.geo_transform() {
        Ok(gt) => Some(gt),
        Err(e) => {
            warn!("Input has no geotransform ({}), output will not be georeferenced", e);
            None
        }
    };

    Ok(RasterMetadata {
        width,
        height,
        band_count,
        geotransform,
        projection: dataset.projection(),
    })
}

impl RasterSource for GdalSource {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_band(&self, index: usize) -> Result<Band> {
        let rasterband: RasterBand = self.dataset.rasterband(index)?;
        let (width, height) = (self.metadata.width, self.metadata.height);

        let buffer = rasterband.read_as::<f64>((0, 0), (width, height), (width, height), None)?;
        let data_vec: Vec<f64> = buffer.into_iter().collect();
        let data = Array2::from_shape_vec((height, width), data_vec)?;

        let nodata = rasterband.no_data_value();
        let color = from_gdal_color(rasterband.color_interpretation());
        debug!("Read band {}: nodata={:?}, color={:?}", index, nodata, color);

        Ok(Band { data, nodata, color })
    }
}

impl RasterSink for GdalSink {
    fn write_band(&mut self, index: usize, band: &OutputBand) -> Result<()> {
        let mut raster_band = self.dataset.rasterband(index)?;

        let (rows, cols) = band.data.dim();
        if (rows, cols) != (self.height, self.width) {
            return Err(KernelFilterError::BandShapeMismatch {
                band: index,
                width: self.width,
                height: self.height,
                actual_width: cols,
                actual_height: rows,
            });
        }

        // GDAL expects row-major data, which is how Array2 stores it
        let values: Vec<f32> = band.data.iter().copied().collect();
        let mut buffer = Buffer::new((self.width, self.height), values);
        raster_band.write((0, 0), (self.width, self.height), &mut buffer)?;

        raster_band.set_color_interpretation(to_gdal_color(band.color))?;
        if let Some(nodata) = band.nodata {
            raster_band.set_no_data_value(Some(nodata))?;
        }

        debug!("Wrote band {} ({}x{})", index, self.width, self.height);
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.dataset.flush_cache()?;
        debug!("Flushed output dataset");
        Ok(())
    }
}

impl RasterProvider for GdalProvider {
    type Source = GdalSource;
    type Sink = GdalSink;

    fn open(&self, path: &Path) -> Result<GdalSource> {
        info!("Opening input raster: {}", path.display());
        let dataset = Dataset::open(path).map_err(|e| KernelFilterError::RasterOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let metadata = extract_metadata(&dataset)?;
        debug!(
            "Input {}x{}, {} bands, CRS {}",
            metadata.width,
            metadata.height,
            metadata.band_count,
            describe_projection(&metadata.projection)
        );

        Ok(GdalSource { dataset, metadata })
    }

    fn create(&self, path: &Path, metadata: &RasterMetadata, options: &CreationOptions) -> Result<GdalSink> {
        info!("Creating output raster: {}", path.display());

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let driver_options = options.to_driver_options();

        let mut dataset = if driver_options.is_empty() {
            driver.create_with_band_type::<f32, _>(
                path,
                metadata.width,
                metadata.height,
                metadata.band_count,
            )?
        } else {
            let mut gdal_options = CslStringList::new();
            for opt in &driver_options {
                gdal_options.add_string(opt)?;
            }

            driver.create_with_band_type_with_options::<f32, _>(
                path,
                metadata.width,
                metadata.height,
                metadata.band_count,
                &gdal_options,
            )?
        };

        if let Some(geotransform) = &metadata.geotransform {
            dataset.set_geo_transform(geotransform)?;
        }
        if !metadata.projection.is_empty() {
            dataset.set_projection(&metadata.projection)?;
        }

        Ok(GdalSink {
            dataset,
            width: metadata.width,
            height: metadata.height,
        })
    }
}
