use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "kernel-filter")]
#[command(about = "Apply a square convolution kernel to every band of a raster")]
#[command(version)]
pub struct Args {
    /// Input raster path (any GDAL-readable format)
    #[arg(short, long, value_name = "FILE")]
    pub input: String,

    /// Kernel text file: N*N numbers separated by spaces or commas
    #[arg(short, long, value_name = "FILE")]
    pub kernel: String,

    /// Output GeoTIFF path (multi-band float32)
    #[arg(short, long, value_name = "FILE")]
    pub output: String,

    /// Output compression: DEFLATE, LZW, ZSTD or NONE
    #[arg(long, value_name = "TYPE")]
    pub compress: Option<String>,

    /// Write a tiled GeoTIFF with this block size (multiple of 16)
    #[arg(long, value_name = "PIXELS")]
    pub tile_size: Option<usize>,

    /// Number of threads (default: all available)
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
