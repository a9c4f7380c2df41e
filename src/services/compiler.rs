//! Download-and-concatenate pipeline.
//!
//! A run lists the bucket under a prefix, downloads every object whose
//! modification date falls inside the requested window into the staging
//! directory, then loads *every* `.csv` file found there (including files left
//! by earlier runs) and concatenates them into one [`Table`]. The whole run is
//! sequential and the first failure aborts it; staged files may be left behind
//! in that case.

use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::models::Table;
use crate::services::storage::StorageService;
use crate::utils::validation::{is_csv_file, parse_date_range, staged_file_name};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parameters of one compile run.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub bucket: String,
    pub prefix: String,
    /// Inclusive start, `YYYY-MM-DD`
    pub start_date: String,
    /// Inclusive end, `YYYY-MM-DD`
    pub end_date: String,
    pub output_path: Option<PathBuf>,
    pub keep_files: bool,
}

impl CompileRequest {
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            output_path: None,
            keep_files: false,
        }
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }
}

/// What a run did, alongside the compiled table.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub table: Table,
    /// Keys fetched during this run, in listing order
    pub downloaded: Vec<String>,
    /// Staged files that were loaded, in load order
    pub staged_files: Vec<PathBuf>,
    /// Whether the staged files were deleted afterwards
    pub cleaned_up: bool,
}

pub struct CsvCompiler {
    storage: Arc<dyn StorageService>,
    staging_dir: PathBuf,
}

impl CsvCompiler {
    pub fn new(storage: Arc<dyn StorageService>, config: &CompilerConfig) -> Self {
        Self {
            storage,
            staging_dir: config.staging_dir.clone(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Runs the pipeline and returns the concatenated table.
    pub async fn compile(&self, request: &CompileRequest) -> Result<Table> {
        self.run(request).await.map(|report| report.table)
    }

    /// Like [`compile`](Self::compile) but also reports which keys were
    /// downloaded and which staged files were loaded.
    pub async fn run(&self, request: &CompileRequest) -> Result<CompileReport> {
        let range = parse_date_range(&request.start_date, &request.end_date)?;
        if range.is_empty() {
            warn!(
                "Date range {}..={} is empty; nothing will be downloaded",
                range.start, range.end
            );
        }

        self.ensure_staging_dir().await?;

        info!(
            "📋 Listing s3://{}/{} (window {}..={})",
            request.bucket, request.prefix, range.start, range.end
        );
        let objects = self
            .storage
            .list_objects(&request.bucket, &request.prefix)
            .await
            .map_err(|e| {
                CompileError::Download(format!(
                    "failed to list s3://{}/{}: {:#}",
                    request.bucket, request.prefix, e
                ))
            })?;

        let mut downloaded = Vec::new();
        for object in &objects {
            if !range.contains(object.modified_date()) {
                debug!("Skipping {} (modified {})", object.key, object.last_modified);
                continue;
            }

            let Some(file_name) = staged_file_name(&object.key) else {
                debug!("Skipping {} (no file name)", object.key);
                continue;
            };

            let dest = self.staging_dir.join(file_name);
            info!("📥 Downloading {} -> {}", object.key, dest.display());
            self.storage
                .download_to(&request.bucket, &object.key, &dest)
                .await
                .map_err(|e| {
                    CompileError::Download(format!(
                        "failed to download s3://{}/{}: {:#}",
                        request.bucket, object.key, e
                    ))
                })?;
            downloaded.push(object.key.clone());
        }
        info!(
            "Downloaded {} of {} listed objects",
            downloaded.len(),
            objects.len()
        );

        let staged_files = self.staged_csv_files().await?;
        let table = load_tables(&staged_files)?;

        if let Some(output_path) = &request.output_path {
            table
                .write_csv(output_path)
                .map_err(|e| CompileError::write(output_path, e))?;
            info!("💾 Wrote {} rows to {}", table.num_rows(), output_path.display());
        }

        let cleaned_up = !request.keep_files;
        if cleaned_up {
            remove_files(&staged_files).await?;
        }

        info!(
            "✅ Compiled {} rows x {} columns from {} files",
            table.num_rows(),
            table.num_columns(),
            staged_files.len()
        );

        Ok(CompileReport {
            table,
            downloaded,
            staged_files,
            cleaned_up,
        })
    }

    async fn ensure_staging_dir(&self) -> Result<()> {
        let is_dir = tokio::fs::metadata(&self.staging_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        if !is_dir {
            return Err(CompileError::Download(format!(
                "staging directory {} does not exist",
                self.staging_dir.display()
            )));
        }
        Ok(())
    }

    /// Every `.csv` file in the staging directory, sorted by file name.
    async fn staged_csv_files(&self) -> Result<Vec<PathBuf>> {
        let read_err = |e: std::io::Error| {
            CompileError::Download(format!(
                "failed to read staging directory {}: {}",
                self.staging_dir.display(),
                e
            ))
        };

        let mut entries = tokio::fs::read_dir(&self.staging_dir)
            .await
            .map_err(read_err)?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file && is_csv_file(&path) {
                files.push(path);
            }
        }

        files.sort();
        debug!("Found {} staged csv files", files.len());
        Ok(files)
    }
}

fn load_tables(files: &[PathBuf]) -> Result<Table> {
    let mut tables = Vec::with_capacity(files.len());
    for path in files {
        debug!("Loading {}", path.display());
        let table = Table::read_csv(path).map_err(|e| CompileError::parse(path, e))?;
        tables.push(table);
    }
    Ok(Table::concat(tables))
}

async fn remove_files(files: &[PathBuf]) -> Result<()> {
    for path in files {
        tokio::fs::remove_file(path)
            .await
            .map_err(|source| CompileError::Cleanup {
                path: path.clone(),
                source,
            })?;
    }
    debug!("Removed {} staged files", files.len());
    Ok(())
}
