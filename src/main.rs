use anyhow::Context;
use clap::Parser;
use csv_compiler::infrastructure::storage;
use csv_compiler::{CompileRequest, CompilerConfig, CsvCompiler, StorageConfig};
use dotenvy::dotenv;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Download dated CSV objects from S3 and concatenate them", long_about = None)]
struct Args {
    /// Bucket to read from (falls back to S3_BUCKET)
    #[arg(short, long)]
    bucket: Option<String>,

    /// Key prefix to list
    #[arg(short, long)]
    prefix: String,

    /// First modification date to include, YYYY-MM-DD
    #[arg(long)]
    start: String,

    /// Last modification date to include, YYYY-MM-DD
    #[arg(long)]
    end: String,

    /// Write the compiled CSV here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Leave the downloaded files in the staging directory
    #[arg(long)]
    keep_files: bool,

    /// Staging directory (falls back to CSV_STAGING_DIR, then downloaded_csvs)
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    bucket: String,
    prefix: String,
    rows: usize,
    columns: Vec<String>,
    downloaded: Vec<String>,
    staged_files: Vec<PathBuf>,
    cleaned_up: bool,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csv_compiler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let storage_config = StorageConfig::from_env();
    let mut compiler_config = CompilerConfig::from_env();
    if let Some(dir) = args.staging_dir {
        compiler_config.staging_dir = dir;
    }

    let bucket = args
        .bucket
        .or_else(|| storage_config.bucket.clone())
        .context("no bucket given: pass --bucket or set S3_BUCKET")?;

    info!(
        "🚀 Compiling s3://{}/{} into {}",
        bucket,
        args.prefix,
        compiler_config.staging_dir.display()
    );

    let storage_service = storage::setup_storage(&storage_config).await;
    let compiler = CsvCompiler::new(storage_service, &compiler_config);

    let mut request = CompileRequest::new(&bucket, &args.prefix, args.start, args.end)
        .keep_files(args.keep_files);
    if let Some(output) = &args.output {
        request = request.output_path(output);
    }

    let report = match compiler.run(&request).await {
        Ok(report) => report,
        Err(e) => {
            error!("❌ Compile failed: {}", e);
            return Err(e.into());
        }
    };

    let summary = Summary {
        bucket,
        prefix: args.prefix,
        rows: report.table.num_rows(),
        columns: report.table.columns().to_vec(),
        downloaded: report.downloaded,
        staged_files: report.staged_files,
        cleaned_up: report.cleaned_up,
        output: args.output,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} rows, {} columns from {} files ({} downloaded)",
            summary.rows,
            summary.columns.len(),
            summary.staged_files.len(),
            summary.downloaded.len()
        );
        if let Some(output) = &summary.output {
            println!("written to {}", output.display());
        }
    }

    Ok(())
}
