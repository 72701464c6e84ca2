use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use cfedump_core::params::CaptureParams;
use cfedump_core::session::{CaptureError, CaptureSession};
use cfedump_core::transport::{ReplayTransport, SerialTransport, Transport};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Broadcom CFE console NAND dumper", long_about = None)]
struct Args {
    /// Serial port of the CFE console
    #[arg(short = 'D', long, conflicts_with = "input_file")]
    device: Option<String>,

    /// Replay a captured console log instead of driving a live console
    #[arg(short = 'i', long)]
    input_file: Option<PathBuf>,

    /// Serial baud rate
    #[arg(short = 'b', long, default_value_t = 115200)]
    baudrate: u32,

    /// Serial read timeout in seconds
    #[arg(short = 't', long, default_value_t = 0.1)]
    timeout: f64,

    /// Output file, '-' for stdout
    #[arg(short = 'O', long, default_value = "-")]
    output: String,

    /// Capture parameter file (TOML); flags below override its values
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// NAND size in bytes
    #[arg(short = 'N', long)]
    nand_size: Option<u64>,

    /// Block size in bytes
    #[arg(short = 'B', long)]
    block_size: Option<u32>,

    /// Page size in bytes
    #[arg(short = 'P', long)]
    page_size: Option<u32>,

    /// Max retries per page on failure
    #[arg(short = 'r', long)]
    max_retries: Option<u32>,

    /// Console dumps a spare area after each page
    #[arg(long)]
    spare_area: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one or more pages, one request per page
    Page {
        block: u32,
        page: u32,
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Read a run of pages as one bulk stream
    PagesBulk { block: u32, page: u32, count: u32 },
    /// Read one or more blocks
    Block {
        block: u32,
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Read the entire NAND
    Nand,
    /// Read the entire NAND as one bulk stream
    NandBulk,
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn build_params(args: &Args) -> Result<CaptureParams> {
    let mut params = match &args.config {
        Some(path) => CaptureParams::load_from_file(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => CaptureParams::default(),
    };
    if let Some(nand_size) = args.nand_size {
        params.nand_size = nand_size;
    }
    if let Some(block_size) = args.block_size {
        params.block_size = block_size;
    }
    if let Some(page_size) = args.page_size {
        params.page_size = page_size;
    }
    if let Some(max_retries) = args.max_retries {
        params.max_retries = max_retries;
    }
    if args.spare_area {
        params.spare_area = true;
    }
    params.validate()?;
    Ok(params)
}

fn open_transport(args: &Args) -> Result<Box<dyn Transport>> {
    if let Some(device) = &args.device {
        let timeout = Duration::from_secs_f64(args.timeout);
        let serial = SerialTransport::open(device, args.baudrate, timeout)
            .with_context(|| format!("opening {device}"))?;
        Ok(Box::new(serial))
    } else if let Some(path) = &args.input_file {
        let replay =
            ReplayTransport::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Box::new(replay))
    } else {
        bail!("provide either --device or --input-file");
    }
}

fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(io::stdout().lock()))
    } else {
        let file = File::create(path).with_context(|| format!("creating {path}"))?;
        Ok(Box::new(file))
    }
}

fn byte_progress(total_bytes: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn run(args: Args) -> Result<()> {
    let params = build_params(&args)?;
    let transport = open_transport(&args)?;
    let interactive = transport.is_interactive();
    let mut session = CaptureSession::new(transport, params.clone());

    let total_pages: u64 = match &args.command {
        Command::Page { count, .. } | Command::PagesBulk { count, .. } => u64::from(*count),
        Command::Block { count, .. } => u64::from(params.pages_per_block()) * u64::from(*count),
        Command::Nand | Command::NandBulk => params.total_pages(),
    };

    session.prime().context("console synchronization failed")?;

    let mut writer = open_output(&args.output)?;
    let progress = byte_progress(total_pages * u64::from(params.page_size))?;

    let mut pages_read: u64 = 0;
    let result = (|| -> Result<()> {
        let pages: Box<dyn Iterator<Item = Result<Vec<u8>, CaptureError>> + '_> =
            match args.command {
                Command::Page { block, page, count } => {
                    Box::new(session.read_pages(block, page, count))
                }
                Command::PagesBulk { block, page, count } => {
                    Box::new(session.read_pages_bulk(block, page, count)?)
                }
                Command::Block { block, count } => Box::new(session.read_blocks(block, count)),
                Command::Nand => Box::new(session.read_nand()),
                Command::NandBulk => Box::new(session.read_nand_bulk()?),
            };

        for page in pages {
            let page = page?;
            writer.write_all(&page)?;
            pages_read += 1;
            // A live capture can die at any moment; keep the file current.
            // Replay is cheap enough to flush only now and then.
            if interactive || pages_read % 200 == 0 {
                writer.flush()?;
            }
            progress.set_position(pages_read * u64::from(params.page_size));
        }
        Ok(())
    })();
    writer.flush()?;

    match result {
        Ok(()) => {
            progress.finish_with_message("capture complete");
            info!(pages = pages_read, "done");
            Ok(())
        }
        Err(e) => {
            // Pages already written stay valid; the image is a best-effort
            // prefix of the capture.
            progress.abandon_with_message("capture aborted");
            error!(pages = pages_read, "capture aborted");
            Err(e)
        }
    }
}
