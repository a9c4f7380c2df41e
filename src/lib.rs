pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::config::{CompilerConfig, StorageConfig};
pub use crate::error::CompileError;
pub use crate::models::{DateRange, ObjectRecord, Table};
pub use crate::services::compiler::{CompileReport, CompileRequest, CsvCompiler};
pub use crate::services::storage::{S3StorageService, StorageService};
