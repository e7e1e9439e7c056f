//! groove-clip: thicken a shell model and add grooves with matching clips.
//!
//! Usage: groove-clip <input> <output> [params.json]
//!
//! Runs on the truck backend, which reads truck compressed-JSON solids (not
//! STEP) and has no shell offset, so runs stop at the thickening phase.

use std::path::PathBuf;
use std::process::ExitCode;

use geom_kernel::TruckKernel;
use groove_pipeline::{Pipeline, PipelineParameters};

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, output, params_path) = match args.as_slice() {
        [input, output] => (input, output, None),
        [input, output, params] => (input, output, Some(params)),
        _ => {
            eprintln!("usage: groove-clip <input> <output> [params.json]");
            eprintln!();
            eprintln!("  <input>   truck compressed-JSON solid (STEP input is not read)");
            eprintln!("  <output>  .step/.stp or .json; an .stl preview is written alongside");
            eprintln!();
            eprintln!("note: the truck backend cannot offset shells, so thickening fails");
            eprintln!("      and no output is produced with this binary.");
            return ExitCode::from(2);
        }
    };

    let params = match params_path {
        Some(path) => match PipelineParameters::load(&PathBuf::from(path)) {
            Ok(params) => params,
            Err(e) => {
                tracing::error!(error = %e, "could not load parameters");
                return ExitCode::from(2);
            }
        },
        None => PipelineParameters::default(),
    };

    let mut kernel = TruckKernel::new();
    let result = Pipeline::new(params).run(&mut kernel, &PathBuf::from(input), &PathBuf::from(output));
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }

    if result.succeeded {
        println!(
            "{}: {} groove/clip pairs placed, {} skipped, saved to {}",
            result.message,
            result.placed,
            result.skipped.len(),
            output
        );
        ExitCode::SUCCESS
    } else {
        eprintln!("{}", result.message);
        ExitCode::FAILURE
    }
}
