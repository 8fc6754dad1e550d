//! Explicit run configuration built once from the command line and handed to
//! each component at construction.

use std::path::PathBuf;
use url::Url;

use crate::cli::Cli;
use crate::elasticsearch::parse_input_url;
use crate::error::{ExportError, Result};
use crate::indices::{DateRange, IndexId, check_path_safe};

pub const DEFAULT_PAGE_SIZE: u64 = 10_000;

/// Connection settings for the search backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
    /// TLS certificate validation; on unless explicitly disabled
    pub verify_tls: bool,
    pub compress: bool,
}

/// Shape of every search request issued for an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub keyword: String,
    pub match_field: String,
    pub log_field: String,
    pub sort_field: String,
    pub page_size: u64,
}

impl QuerySettings {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            match_field: "message".to_string(),
            log_field: "log".to_string(),
            sort_field: "@timestamp".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Which indices a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSelection {
    Range { range: DateRange, namespace: String },
    Explicit(Vec<IndexId>),
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub backend: BackendConfig,
    pub query: QuerySettings,
    pub output_dir: PathBuf,
    pub selection: IndexSelection,
    pub show_progress: bool,
}

impl ExportConfig {
    pub fn from_cli(args: &Cli) -> Result<Self> {
        if args.page_size == 0 {
            return Err(ExportError::Config(
                "--page-size must be greater than zero".to_string(),
            ));
        }

        let (url, username, password) =
            parse_input_url(&args.url, args.username.as_deref(), args.password.as_deref())?;

        let selection = if !args.index.is_empty() {
            IndexSelection::Explicit(
                args.index
                    .iter()
                    .map(|name| IndexId::parse(name))
                    .collect::<Result<_>>()?,
            )
        } else {
            match (&args.start_date, &args.end_date, &args.namespace) {
                (Some(start), Some(end), Some(namespace)) => {
                    check_path_safe("namespace", namespace)?;
                    IndexSelection::Range {
                        range: DateRange::parse(start, end)?,
                        namespace: namespace.clone(),
                    }
                }
                _ => {
                    return Err(ExportError::Config(
                        "either --index or all of --start-date, --end-date and --namespace are required"
                            .to_string(),
                    ));
                }
            }
        };

        Ok(Self {
            backend: BackendConfig {
                url,
                username,
                password,
                verify_tls: !args.insecure,
                compress: args.es_compress,
            },
            query: QuerySettings {
                keyword: args.keyword.clone(),
                match_field: args.match_field.clone(),
                log_field: args.log_field.clone(),
                sort_field: args.sort_field.clone(),
                page_size: args.page_size,
            },
            output_dir: args.output_dir.clone(),
            selection,
            show_progress: !args.quiet,
        })
    }
}
