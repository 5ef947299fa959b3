use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use qrsmith::render::{write_svg, Shape, SvgOptions};
use qrsmith::{self_check, ECLevel, Mode, QRBuilder};

#[derive(Parser)]
#[command(name = "qrsmith", version, about = "Generate QR codes as styled SVG files")]
struct Cli {
    /// Text to encode
    text: String,

    /// Error correction level
    #[arg(long, value_enum, default_value_t = EcArg::M)]
    ec_level: EcArg,

    /// Output file
    #[arg(long, short, default_value = "qr.svg")]
    output: PathBuf,

    /// Module shape
    #[arg(long, value_enum, default_value_t = ShapeArg::Square)]
    shape: ShapeArg,

    /// Module color (any CSS color)
    #[arg(long, default_value = "#000000")]
    color: String,

    /// Path or data URI of a centre logo
    #[arg(long)]
    logo: Option<String>,

    /// Pixels per module
    #[arg(long, default_value_t = 10)]
    scale: u32,

    /// Lower bound for the version search
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=40))]
    min_version: Option<u8>,

    /// Force a single encoding mode instead of optimal segmentation
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Verbose logging, capacity table check and a terminal preview
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum EcArg {
    L,
    M,
    Q,
    H,
}

impl From<EcArg> for ECLevel {
    fn from(ec: EcArg) -> Self {
        match ec {
            EcArg::L => ECLevel::L,
            EcArg::M => ECLevel::M,
            EcArg::Q => ECLevel::Q,
            EcArg::H => ECLevel::H,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ShapeArg {
    Square,
    Circle,
    Rounded,
    Squircle,
}

impl From<ShapeArg> for Shape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Square => Shape::Square,
            ShapeArg::Circle => Shape::Circle,
            ShapeArg::Rounded => Shape::Rounded,
            ShapeArg::Squircle => Shape::Squircle,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ModeArg {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Numeric => Mode::Numeric,
            ModeArg::Alphanumeric => Mode::Alphanumeric,
            ModeArg::Byte => Mode::Byte,
            ModeArg::Kanji => Mode::Kanji,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if cli.debug {
        let mismatches = self_check();
        if mismatches > 0 {
            error!(mismatches, "capacity catalogue is inconsistent");
        } else {
            debug!("capacity catalogue verified");
        }
    }

    let mut builder = QRBuilder::new(cli.text.as_bytes());
    builder.ec_level(cli.ec_level.into());
    if let Some(v) = cli.min_version {
        builder.min_version(v as usize);
    }
    if let Some(m) = cli.mode {
        builder.mode(m.into());
    }

    let qr = match builder.build() {
        Ok(qr) => qr,
        Err(e) => {
            error!("failed to encode: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.debug {
        eprintln!("{}", qr.to_str(1));
    }

    let options = SvgOptions {
        scale: cli.scale,
        shape: cli.shape.into(),
        color: cli.color,
        logo: cli.logo,
        debug: cli.debug,
    };
    if let Err(e) = write_svg(&qr, &options, &cli.output) {
        error!("failed to write {}: {e}", cli.output.display());
        return ExitCode::FAILURE;
    }

    info!(
        version = *qr.version(),
        width = qr.width(),
        mask = qr.mask_pattern().map(|m| *m),
        output = %cli.output.display(),
        "QR written"
    );
    ExitCode::SUCCESS
}
