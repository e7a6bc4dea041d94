use clap::{Parser, Subcommand};
use rayon::prelude::*;
use retouch::batch::{self, BatchStore, FsBatchStore};
use retouch::config;
use retouch::imaging::{CapabilityRegistry, ImageBuffer, OutputFormat, Providers, RustCodec};
use retouch::output;
use retouch::pipeline::{self, Completed, EditRequest, Failure, Pipeline};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Apply named image operations from the command line")]
#[command(long_about = "\
Apply named image operations from the command line

Every edit decodes the input, looks up the operation, decodes its JSON
parameters, runs it and re-encodes the result as three-channel BGR.

Operation names:

  adjustments                          brightness / contrast / saturation / hue
  auto_color                           automatic color correction
  background_removal                   replace the background with a flat fill
  <category>.<function>                e.g. geometric_transformations.rotate

Examples:

  retouch edit beach.jpg -x adjustments -p '{\"brightness\": 120}'
  retouch edit *.png -x geometric_transformations.rotate -p '{\"angle\": 180}'
  retouch operations

Failures print 'error [<status>]: <message>' where status is 400 for bad
input and 500 for a failed transform.

Run 'retouch gen-config' to generate a documented retouch.toml.")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (missing file means stock defaults)
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct EditArgs {
    /// Images to edit
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Operation identifier, e.g. `adjustments` or `filtering.median_filter`
    #[arg(short = 'x', long)]
    operation: String,

    /// JSON object of operation parameters
    #[arg(short, long)]
    params: Option<String>,

    /// Directory for edited images
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply one operation to one or more images
    Edit(EditArgs),
    /// Decode and re-encode an image as three-channel PNG
    Normalize {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a white canvas
    Blank {
        #[arg(long, default_value_t = pipeline::BLANK_WIDTH)]
        width: u32,
        #[arg(long, default_value_t = pipeline::BLANK_HEIGHT)]
        height: u32,
        #[arg(short, long, default_value = "blank.png")]
        output: PathBuf,
    },
    /// Open an image from disk and emit it as PNG
    Open {
        image_path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save an image into the batch save directory
    Save {
        input: PathBuf,
        /// Target directory (defaults to `output.save_dir` from config)
        #[arg(long)]
        save_path: Option<PathBuf>,
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },
    /// Re-encode an image for download
    Export {
        input: PathBuf,
        #[arg(short, long)]
        format: Option<OutputFormat>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List every registered operation and its parameters
    Operations,
    /// Print a stock retouch.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let config = config::load_config(&cli.config)?;
    init_logging(&config.logging);
    let registry = CapabilityRegistry::with_providers(Providers::local(&config), &config.limits)?;
    let codec = config.codec();
    let pipeline = Pipeline::new(&registry, &codec);

    let outcome = match cli.command {
        Command::Edit(args) => {
            init_thread_pool(&config.processing);
            let format = args.format.unwrap_or(config.output.format);
            std::fs::create_dir_all(&args.output_dir)?;
            let results: Vec<_> = args
                .inputs
                .par_iter()
                .map(|input| edit_one(&pipeline, &args, input, format))
                .collect();
            let mut failed = 0;
            for (i, (input, result)) in args.inputs.iter().zip(&results).enumerate() {
                output::print_edit_result(i + 1, input, result);
                if result.is_err() {
                    failed += 1;
                }
            }
            println!();
            println!(
                "{}",
                output::format_edit_summary(results.len() - failed, failed)
            );
            if failed == 0 {
                Ok(())
            } else {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Normalize { input, output } => read_input(&input)
            .and_then(|bytes| pipeline.normalize(&bytes).map_err(|e| e.to_failure()))
            .and_then(|done| {
                let target = output.unwrap_or_else(|| {
                    PathBuf::from(batch::edited_file_name(&input, "normalized", done.format))
                });
                write_output(&target, &done)
            }),
        Command::Blank {
            width,
            height,
            output,
        } => pipeline::blank_layer(width, height)
            .map_err(|e| Failure {
                status: 400,
                message: e.to_string(),
            })
            .and_then(|image| pipeline.encode(&image, OutputFormat::Png).map_err(|e| e.to_failure()))
            .and_then(|done| write_output(&output, &done)),
        Command::Open { image_path, output } => {
            let store = FsBatchStore::new(config.output.save_dir(), codec);
            store
                .open(&image_path)
                .map_err(|e| e.to_failure())
                .and_then(|image| pipeline.encode(&image, OutputFormat::Png).map_err(|e| e.to_failure()))
                .and_then(|done| {
                    let target = output.unwrap_or_else(|| {
                        PathBuf::from(batch::edited_file_name(&image_path, "opened", done.format))
                    });
                    write_output(&target, &done)
                })
        }
        Command::Save {
            input,
            save_path,
            format,
        } => {
            let dir = save_path.unwrap_or_else(|| config.output.save_dir());
            let store = FsBatchStore::new(dir, codec);
            let format = format.unwrap_or(config.output.format);
            store
                .open(&input)
                .and_then(|image| store.save(&image, format))
                .map(|path| println!("{}", output::format_saved(&path)))
                .map_err(|e| e.to_failure())
        }
        Command::Export {
            input,
            format,
            output,
        } => {
            let store = FsBatchStore::new(config.output.save_dir(), codec);
            let format = format.unwrap_or(config.output.format);
            store
                .open(&input)
                .and_then(|image| {
                    let bytes = store.export(&image, format)?;
                    Ok(completed(bytes, format, &image))
                })
                .map_err(|e| e.to_failure())
                .and_then(|done| {
                    let target = output.unwrap_or_else(|| {
                        PathBuf::from(batch::edited_file_name(&input, "export", format))
                    });
                    write_output(&target, &done)
                })
        }
        Command::Operations => {
            output::print_operations(&registry);
            Ok(())
        }
        Command::GenConfig => Ok(()),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(failure) => {
            output::print_failure(&failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run one input through the pipeline and write the result.
fn edit_one(
    pipeline: &Pipeline<'_, RustCodec>,
    args: &EditArgs,
    input: &Path,
    format: OutputFormat,
) -> Result<(PathBuf, Completed), Failure> {
    let bytes = read_input(input)?;
    let request = EditRequest {
        image: &bytes,
        operation: &args.operation,
        params: args.params.as_deref(),
        format,
    };
    let done = pipeline.edit(&request).map_err(|e| e.to_failure())?;
    let target = args
        .output_dir
        .join(batch::edited_file_name(input, &args.operation, format));
    std::fs::write(&target, &done.bytes).map_err(|e| Failure {
        status: 500,
        message: format!("{}: {}", target.display(), e),
    })?;
    Ok((target, done))
}

/// An unreadable upload is the caller's fault.
fn read_input(path: &Path) -> Result<Vec<u8>, Failure> {
    std::fs::read(path).map_err(|e| Failure {
        status: 400,
        message: format!("{}: {}", path.display(), e),
    })
}

fn write_output(path: &Path, done: &Completed) -> Result<(), Failure> {
    std::fs::write(path, &done.bytes).map_err(|e| Failure {
        status: 500,
        message: format!("{}: {}", path.display(), e),
    })?;
    output::print_written(path, done);
    Ok(())
}

fn completed(bytes: Vec<u8>, format: OutputFormat, image: &ImageBuffer) -> Completed {
    Completed {
        bytes,
        mime_type: format.mime_type(),
        format,
        width: image.width(),
        height: image.height(),
    }
}

/// `RUST_LOG` wins over `logging.level` from config. Logs go to stderr so
/// stdout stays clean for results.
fn init_logging(logging: &config::LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
