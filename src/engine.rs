use crate::convolve::{correlate_reflect, restore_nodata};
use crate::creation::CreationOptions;
use crate::error::{ErrorKind, KernelFilterError, Result};
use crate::feedback::Feedback;
use crate::kernel::Kernel;
use crate::provider::{RasterProvider, RasterSink, RasterSource};
use crate::raster::OutputBand;
use log::debug;
use std::error::Error as _;
use std::path::{Path, PathBuf};

/// The three user-facing parameters plus output creation options
#[derive(Debug, Clone, Default)]
pub struct FilterRequest {
    pub input: PathBuf,
    pub kernel: PathBuf,
    pub output: PathBuf,
    pub creation: CreationOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub output: PathBuf,
    pub band_count: usize,
    pub bands_processed: usize,
    pub canceled: bool,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        !self.canceled && self.bands_processed == self.band_count
    }
}

/// Convolve every band of `input` with `kernel` into a new Float32 raster at `output`.
///
/// Bands are handled strictly in order. Cancellation is polled before each band; bands already
/// written stay in the output.
pub fn run_convolution<P: RasterProvider>(
    provider: &P,
    input: &Path,
    kernel: &Kernel,
    output: &Path,
    creation: &CreationOptions,
    feedback: &mut dyn Feedback,
) -> Result<RunOutcome> {
    let source = provider.open(input)?;
    let metadata = source.metadata().clone();

    if metadata.width == 0 || metadata.height == 0 {
        return Err(KernelFilterError::InvalidDimensions(metadata.width, metadata.height));
    }

    feedback.push_info(&format!(
        "Dimensions: {}x{}, Bands: {}",
        metadata.width, metadata.height, metadata.band_count
    ));

    let mut sink = provider.create(output, &metadata, creation)?;

    let total = metadata.band_count;
    let mut processed = 0;
    let mut canceled = false;

    if total == 0 {
        feedback.set_progress(100.0);
    }

    for index in 1..=total {
        if feedback.is_canceled() {
            canceled = true;
            break;
        }

        feedback.push_info(&format!("Processing band {}/{}...", index, total));
        let band = source.read_band(index)?;

        let (rows, cols) = band.data.dim();
        if (rows, cols) != metadata.shape() {
            return Err(KernelFilterError::BandShapeMismatch {
                band: index,
                width: metadata.width,
                height: metadata.height,
                actual_width: cols,
                actual_height: rows,
            });
        }

        let mut result = correlate_reflect(band.data.view(), kernel)?;
        if let Some(nodata) = band.nodata {
            let restored = restore_nodata(band.data.view(), &mut result, nodata);
            debug!("Band {}: restored {} nodata pixels ({})", index, restored, nodata);
        }

        sink.write_band(index, &OutputBand::from_result(&result, band.nodata, band.color))?;

        processed += 1;
        feedback.set_progress(processed as f64 / total as f64 * 100.0);
    }

    sink.close()?;
    drop(source);

    if canceled {
        debug!("Canceled after {}/{} bands", processed, total);
    } else {
        feedback.push_info("Finished successfully!");
    }

    Ok(RunOutcome {
        output: output.to_path_buf(),
        band_count: total,
        bands_processed: processed,
        canceled,
    })
}

fn check_inputs<P: RasterProvider>(provider: &P, request: &FilterRequest) -> Result<()> {
    if request.input.as_os_str().is_empty() {
        return Err(KernelFilterError::MissingInput("No raster layer selected.".into()));
    }
    if !provider.exists(&request.input) {
        return Err(KernelFilterError::MissingInput(format!(
            "Source raster file not found: {}",
            request.input.display()
        )));
    }
    if !request.kernel.exists() {
        return Err(KernelFilterError::MissingInput(format!(
            "Kernel file not found: {}",
            request.kernel.display()
        )));
    }
    request.creation.validate()
}

/// Full run: pre-flight checks, kernel loading, then the band loop.
///
/// Pre-flight failures are returned as errors. A failure inside the band loop is reported
/// through `feedback` and yields `Ok(None)`; the output file must then be discarded.
pub fn execute<P: RasterProvider>(
    provider: &P,
    request: &FilterRequest,
    feedback: &mut dyn Feedback,
) -> Result<Option<RunOutcome>> {
    check_inputs(provider, request)?;
    feedback.push_info(&format!("Raster: {}", request.input.display()));

    let kernel = Kernel::load(&request.kernel)?;
    feedback.push_info(&format!("Kernel loaded: {}x{}", kernel.size(), kernel.size()));

    match run_convolution(
        provider,
        &request.input,
        &kernel,
        &request.output,
        &request.creation,
        feedback,
    ) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(err) if err.kind() == ErrorKind::RasterOpen => Err(err),
        Err(err) => {
            feedback.report_error(&format!("Processing error: {}", err));
            feedback.push_debug(&describe_chain(&err));
            Ok(None)
        }
    }
}

fn describe_chain(err: &KernelFilterError) -> String {
    let mut text = format!("{:?}", err);
    let mut cause = err.source();
    while let Some(inner) = cause {
        text.push_str(&format!("\ncaused by: {}", inner));
        cause = inner.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{plain_band, MemoryProvider, MemoryRaster};
    use crate::raster::{Band, ColorInterpretation, GeoTransform, RasterMetadata};
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, Array2};
    use std::io::Write;

    const GT: GeoTransform = [500000.0, 30.0, 0.0, 4100000.0, 0.0, -30.0];
    const WKT: &str = "PROJCS[\"WGS 84 / UTM zone 33N\"]";

    #[derive(Default)]
    struct Recorder {
        info: Vec<String>,
        debug: Vec<String>,
        errors: Vec<String>,
        progress: Vec<f64>,
        cancel_after: Option<usize>,
    }

    impl Feedback for Recorder {
        fn push_info(&mut self, message: &str) {
            self.info.push(message.to_string());
        }
        fn push_debug(&mut self, message: &str) {
            self.debug.push(message.to_string());
        }
        fn report_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
        fn set_progress(&mut self, percent: f64) {
            self.progress.push(percent);
        }
        fn is_canceled(&self) -> bool {
            self.cancel_after.is_some_and(|n| self.progress.len() >= n)
        }
    }

    fn kernel(values: &[f64]) -> Kernel {
        Kernel::from_values(values.to_vec()).unwrap()
    }

    fn seeded(bands: Vec<Band>) -> MemoryProvider {
        let provider = MemoryProvider::new();
        provider.insert("in.tif", MemoryRaster::new(Some(GT), WKT, bands).unwrap());
        provider
    }

    fn run(provider: &MemoryProvider, kernel: &Kernel, feedback: &mut Recorder) -> Result<RunOutcome> {
        run_convolution(
            provider,
            Path::new("in.tif"),
            kernel,
            Path::new("out.tif"),
            &CreationOptions::default(),
            feedback,
        )
    }

    fn kernel_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        file
    }

    #[test]
    fn test_box_blur_constant_raster() {
        let provider = seeded(vec![plain_band(Array2::from_elem((4, 4), 10.0))]);
        let mut feedback = Recorder::default();

        let outcome = run(&provider, &kernel(&[1.0; 9]), &mut feedback).unwrap();
        assert!(outcome.is_complete());

        let out = provider.get("out.tif").unwrap();
        for &v in out.band(1).unwrap().data.iter() {
            assert_abs_diff_eq!(v, 90.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_identity_kernel_roundtrip() {
        let data = arr2(&[[0.25, 1.0, 2.5], [3.0, -4.75, 5.0]]);
        let provider = seeded(vec![plain_band(data.clone())]);
        let identity = kernel(&[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);

        run(&provider, &identity, &mut Recorder::default()).unwrap();

        // Values are exactly representable in f32
        assert_eq!(provider.get("out.tif").unwrap().band(1).unwrap().data, data);
    }

    #[test]
    fn test_output_matches_input_grid_and_georeferencing() {
        let bands = vec![
            plain_band(Array2::zeros((3, 5))),
            plain_band(Array2::ones((3, 5))),
        ];
        let provider = seeded(bands);
        run(&provider, &kernel(&[1.0]), &mut Recorder::default()).unwrap();

        let input = provider.get("in.tif").unwrap().metadata;
        let output = provider.get("out.tif").unwrap();
        assert_eq!(
            output.metadata,
            RasterMetadata {
                width: 5,
                height: 3,
                band_count: 2,
                geotransform: Some(GT),
                projection: WKT.to_string(),
            }
        );
        assert_eq!(output.metadata, input);
        assert!(output.closed);
        assert_eq!(output.written_bands(), 2);
    }

    #[test]
    fn test_nodata_pixels_keep_sentinel_and_metadata() {
        let band = Band {
            data: arr2(&[[1.0, 2.0, 3.0], [4.0, -9999.0, 6.0], [7.0, 8.0, 9.0]]),
            nodata: Some(-9999.0),
            color: ColorInterpretation::Red,
        };
        let provider = seeded(vec![band]);

        run(&provider, &kernel(&[1.0; 9]), &mut Recorder::default()).unwrap();

        let out = provider.get("out.tif").unwrap();
        let written = out.band(1).unwrap();
        assert_eq!(written.data[[1, 1]], -9999.0);
        assert_eq!(written.nodata, Some(-9999.0));
        assert_eq!(written.color, ColorInterpretation::Red);
        // Valid pixels keep the raw convolution, nodata included in the sum
        assert_ne!(written.data[[0, 0]], -9999.0);
    }

    #[test]
    fn test_band_without_nodata_has_no_sentinel() {
        let provider = seeded(vec![plain_band(arr2(&[[-9999.0, 1.0]]))]);
        run(&provider, &kernel(&[2.0]), &mut Recorder::default()).unwrap();

        let written = provider.get("out.tif").unwrap().band(1).cloned().unwrap();
        assert_eq!(written.nodata, None);
        assert_eq!(written.data, arr2(&[[-19998.0, 2.0]]));
    }

    #[test]
    fn test_progress_and_messages_per_band() {
        let provider = seeded(vec![
            plain_band(Array2::zeros((2, 2))),
            plain_band(Array2::zeros((2, 2))),
            plain_band(Array2::zeros((2, 2))),
            plain_band(Array2::zeros((2, 2))),
        ]);
        let mut feedback = Recorder::default();
        run(&provider, &kernel(&[1.0]), &mut feedback).unwrap();

        assert_eq!(feedback.progress, vec![25.0, 50.0, 75.0, 100.0]);
        assert_eq!(feedback.info[0], "Dimensions: 2x2, Bands: 4");
        assert!(feedback.info.contains(&"Processing band 3/4...".to_string()));
        assert_eq!(feedback.info.last().unwrap(), "Finished successfully!");
    }

    #[test]
    fn test_cancel_after_first_band_keeps_partial_output() {
        let provider = seeded(vec![
            plain_band(Array2::from_elem((2, 2), 1.0)),
            plain_band(Array2::from_elem((2, 2), 2.0)),
            plain_band(Array2::from_elem((2, 2), 3.0)),
        ]);
        let mut feedback = Recorder {
            cancel_after: Some(1),
            ..Default::default()
        };

        let outcome = run(&provider, &kernel(&[1.0]), &mut feedback).unwrap();
        assert!(outcome.canceled);
        assert_eq!(outcome.bands_processed, 1);
        assert!(!outcome.is_complete());
        assert!(feedback.errors.is_empty());
        assert!(!feedback.info.contains(&"Finished successfully!".to_string()));

        let out = provider.get("out.tif").unwrap();
        assert!(out.closed);
        assert_eq!(out.metadata.band_count, 3);
        assert!(out.band(1).is_some());
        assert!(out.band(2).is_none());
        assert!(out.band(3).is_none());
    }

    #[test]
    fn test_zero_sized_raster_rejected() {
        let provider = seeded(vec![plain_band(Array2::zeros((0, 4)))]);
        let err = run(&provider, &kernel(&[1.0]), &mut Recorder::default()).unwrap_err();
        assert!(matches!(err, KernelFilterError::InvalidDimensions(4, 0)));
        assert!(provider.get("out.tif").is_none());
    }

    #[test]
    fn test_execute_success() {
        let provider = seeded(vec![plain_band(Array2::from_elem((3, 3), 1.0))]);
        let kernel = kernel_file("1 1 1\n1 1 1\n1 1 1\n");
        let request = FilterRequest {
            input: "in.tif".into(),
            kernel: kernel.path().to_path_buf(),
            output: "out.tif".into(),
            creation: CreationOptions::default(),
        };
        let mut feedback = Recorder::default();

        let outcome = execute(&provider, &request, &mut feedback).unwrap().unwrap();
        assert_eq!(outcome.output, PathBuf::from("out.tif"));
        assert!(outcome.is_complete());
        assert_eq!(feedback.info[0], "Raster: in.tif");
        assert_eq!(feedback.info[1], "Kernel loaded: 3x3");
    }

    #[test]
    fn test_execute_missing_inputs() {
        let provider = seeded(vec![plain_band(Array2::zeros((2, 2)))]);
        let kernel = kernel_file("1");
        let mut feedback = Recorder::default();

        let no_raster = FilterRequest {
            kernel: kernel.path().to_path_buf(),
            output: "out.tif".into(),
            ..Default::default()
        };
        let err = execute(&provider, &no_raster, &mut feedback).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInput);

        let absent_raster = FilterRequest {
            input: "other.tif".into(),
            ..no_raster.clone()
        };
        let err = execute(&provider, &absent_raster, &mut feedback).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInput);

        let dir = tempfile::tempdir().unwrap();
        let absent_kernel = FilterRequest {
            input: "in.tif".into(),
            kernel: dir.path().join("kernel.txt"),
            ..no_raster
        };
        let err = execute(&provider, &absent_kernel, &mut feedback).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInput);
        assert!(provider.get("out.tif").is_none());
    }

    #[test]
    fn test_execute_bad_kernel_stops_before_output() {
        let provider = seeded(vec![plain_band(Array2::zeros((2, 2)))]);
        let kernel = kernel_file("1 2 3 4 5 6 7 8");
        let request = FilterRequest {
            input: "in.tif".into(),
            kernel: kernel.path().to_path_buf(),
            output: "out.tif".into(),
            creation: CreationOptions::default(),
        };

        let err = execute(&provider, &request, &mut Recorder::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KernelFormat);
        assert!(err.to_string().contains("Found 8 values."));
        assert!(provider.get("out.tif").is_none());
    }

    #[test]
    fn test_execute_invalid_creation_options() {
        let provider = seeded(vec![plain_band(Array2::zeros((2, 2)))]);
        let kernel = kernel_file("1");
        let request = FilterRequest {
            input: "in.tif".into(),
            kernel: kernel.path().to_path_buf(),
            output: "out.tif".into(),
            creation: CreationOptions::new(None, Some(100)),
        };

        let err = execute(&provider, &request, &mut Recorder::default()).unwrap_err();
        assert!(matches!(err, KernelFilterError::InvalidTileSize(100)));
    }

    #[test]
    fn test_execute_processing_failure_yields_no_result() {
        // Band 2 has been dropped from the store, so reading it fails mid-run
        let provider = seeded(vec![
            plain_band(Array2::zeros((2, 2))),
            plain_band(Array2::zeros((2, 2))),
        ]);
        let mut raster = provider.get("in.tif").unwrap();
        raster.bands[1] = None;
        provider.insert("in.tif", raster);

        let kernel = kernel_file("1");
        let request = FilterRequest {
            input: "in.tif".into(),
            kernel: kernel.path().to_path_buf(),
            output: "out.tif".into(),
            creation: CreationOptions::default(),
        };
        let mut feedback = Recorder::default();

        let result = execute(&provider, &request, &mut feedback).unwrap();
        assert!(result.is_none());
        assert_eq!(feedback.errors.len(), 1);
        assert!(feedback.errors[0].starts_with("Processing error:"));
        assert!(feedback.debug[0].contains("BandIndex"));
    }
}
