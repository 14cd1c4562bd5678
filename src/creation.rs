use crate::error::{KernelFilterError, Result};

const VALID_COMPRESSION: [&str; 4] = ["DEFLATE", "LZW", "ZSTD", "NONE"];

/// GeoTIFF creation options for the output raster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationOptions {
    /// One of DEFLATE, LZW, ZSTD, NONE; driver default when unset
    pub compression: Option<String>,
    /// Square block size for tiled output; striped when unset
    pub tile_size: Option<usize>,
}

/// Validate compression type
pub fn validate_compression(compression: &str) -> Result<()> {
    if !VALID_COMPRESSION.contains(&compression) {
        return Err(KernelFilterError::InvalidCompression(compression.to_string()));
    }
    Ok(())
}

/// Validate tile size (must be multiple of 16)
pub fn validate_tile_size(tile_size: usize) -> Result<()> {
    if tile_size == 0 || tile_size % 16 != 0 {
        return Err(KernelFilterError::InvalidTileSize(tile_size));
    }
    Ok(())
}

impl CreationOptions {
    pub fn new(compression: Option<String>, tile_size: Option<usize>) -> Self {
        Self {
            compression: compression.map(|c| c.to_ascii_uppercase()),
            tile_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(compression) = &self.compression {
            validate_compression(compression)?;
        }
        if let Some(tile_size) = self.tile_size {
            validate_tile_size(tile_size)?;
        }
        Ok(())
    }

    /// Driver `KEY=VALUE` strings; empty means driver defaults
    pub fn to_driver_options(&self) -> Vec<String> {
        let mut options = Vec::new();
        if let Some(compression) = &self.compression {
            options.push(format!("COMPRESS={}", compression));
        }
        if let Some(tile_size) = self.tile_size {
            options.push("TILED=YES".to_string());
            options.push(format!("BLOCKXSIZE={}", tile_size));
            options.push(format!("BLOCKYSIZE={}", tile_size));
            options.push("BIGTIFF=IF_SAFER".to_string());
        }
        options
    }
}
