use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::process::ExitCode;

use geotiff_kernel_filter::cli::Args;
use geotiff_kernel_filter::{execute, CancelToken, CreationOptions, FilterRequest, GdalProvider, LogFeedback, Result};

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== Raster Kernel Filter ===");

    // Set thread pool size if specified
    if let Some(n_threads) = args.threads {
        match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build_global() {
            Ok(()) => info!("Using {} threads", n_threads),
            Err(e) => warn!("Could not size thread pool ({}), using defaults", e),
        }
    } else {
        info!("Using all available threads");
    }

    // Ctrl-C stops the run at the next band boundary
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Cancellation requested, finishing current band");
        handler_token.cancel();
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let request = FilterRequest {
        input: args.input.into(),
        kernel: args.kernel.into(),
        output: args.output.into(),
        creation: CreationOptions::new(args.compress, args.tile_size),
    };

    let mut feedback = LogFeedback::new(cancel);
    match execute(&GdalProvider, &request, &mut feedback)? {
        Some(outcome) if outcome.canceled => {
            warn!(
                "Canceled after {}/{} bands; partial output left at {}",
                outcome.bands_processed,
                outcome.band_count,
                outcome.output.display()
            );
            Ok(ExitCode::from(130))
        }
        Some(outcome) => {
            info!("Output: {}", outcome.output.display());
            info!("=== Done! ===");
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}
