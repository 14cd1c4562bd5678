use ndarray::Array2;

/// Affine pixel-to-world transform in GDAL order
pub type GeoTransform = [f64; 6];

/// Raster-wide properties shared by every band
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub geotransform: Option<GeoTransform>,
    /// Spatial reference as WKT; empty when the source has none
    pub projection: String,
}

impl RasterMetadata {
    /// Array shape of one band, `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Band color interpretation, carried from input to output unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorInterpretation {
    #[default]
    Undefined,
    Gray,
    Palette,
    Red,
    Green,
    Blue,
    Alpha,
    Hue,
    Saturation,
    Lightness,
    Cyan,
    Magenta,
    Yellow,
    Black,
    YCbCrY,
    YCbCrCb,
    YCbCrCr,
}

/// One input band, samples already widened to f64
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub data: Array2<f64>,
    pub nodata: Option<f64>,
    pub color: ColorInterpretation,
}

/// One convolved band ready to be stored as Float32
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBand {
    pub data: Array2<f32>,
    pub nodata: Option<f64>,
    pub color: ColorInterpretation,
}

impl OutputBand {
    pub fn from_result(result: &Array2<f64>, nodata: Option<f64>, color: ColorInterpretation) -> Self {
        Self {
            data: result.mapv(|v| v as f32),
            nodata,
            color,
        }
    }
}
