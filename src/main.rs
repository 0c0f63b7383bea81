use anyhow::Context;
use clap::{Parser, ValueEnum};
use highline_watermark::attachments::{AttachmentSet, AttachmentSummary, DocumentLabel};
use highline_watermark::batch::process_submission;
use highline_watermark::config::Config;
use highline_watermark::error::IntakeError;
use highline_watermark::logging::init_subscriber_with;
use highline_watermark::watermark::{FileKind, UploadedFile, WatermarkProcessor};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Highline Watermark - stamps applicant documents before they go to staff
#[derive(Parser, Debug)]
#[command(name = "highline-watermark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the generated attachments
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Document slot the files were submitted in
    #[arg(short, long, value_enum, default_value_t = LabelArg::Statement)]
    label: LabelArg,

    /// Process files concurrently
    #[arg(long)]
    parallel: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Files to watermark
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LabelArg {
    /// Bank statements, numbered in argument order
    Statement,
    /// Driver's licence
    Dl,
    /// Void cheque
    Vc,
}

impl LabelArg {
    fn for_index(self, index: usize) -> DocumentLabel {
        match self {
            LabelArg::Statement => DocumentLabel::Statement(index + 1),
            LabelArg::Dl => DocumentLabel::DriversLicence,
            LabelArg::Vc => DocumentLabel::VoidCheque,
        }
    }
}

#[derive(Debug, Serialize)]
struct Manifest {
    files: Vec<ManifestEntry>,
    total_bytes: usize,
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    source: String,
    watermarked: bool,
    kind: FileKind,
    attachments: Vec<AttachmentSummary>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).map_err(IntakeError::Config)?,
        None => Config::default(),
    };

    // Command-line flags override the file
    if args.parallel {
        config.processing.parallel = true;
    }
    if args.json_logs {
        config.logging.json = true;
    }
    if let Some(dir) = &args.out_dir {
        config.output.directory = dir.clone();
    }
    config.validate().map_err(IntakeError::Config)?;

    init_subscriber_with(&config.log_options())?;

    tracing::info!(
        config_file = ?args.config,
        files = args.files.len(),
        parallel = config.processing.parallel,
        out_dir = %config.output.directory.display(),
        "Configuration loaded"
    );

    let uploads = args
        .files
        .iter()
        .map(|path| read_upload(path))
        .collect::<Result<Vec<_>, _>>()?;

    let processor = WatermarkProcessor::new(config.watermark_settings());
    let processed = process_submission(&processor, &uploads, config.processing_mode());

    let mut set = AttachmentSet::new();
    let mut entries = Vec::with_capacity(uploads.len());
    for (index, (upload, result)) in uploads.iter().zip(&processed).enumerate() {
        let before = set.len();
        set.add(&args.label.for_index(index), upload, result);

        entries.push(ManifestEntry {
            source: upload.filename.clone(),
            watermarked: result.watermarked,
            kind: result.kind,
            attachments: set.iter().skip(before).map(|a| a.summary()).collect(),
        });
    }

    set.log_summary();
    set.write_to_dir(&config.output.directory)?;

    let manifest = Manifest {
        files: entries,
        total_bytes: set.total_bytes(),
    };
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
    println!("{}", json);

    Ok(())
}

fn read_upload(path: &Path) -> Result<UploadedFile, IntakeError> {
    let data = std::fs::read(path).map_err(|e| IntakeError::read(path, e))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| IntakeError::read(path, "path has no file name"))?;

    Ok(UploadedFile::new(data, filename, "application/octet-stream"))
}
