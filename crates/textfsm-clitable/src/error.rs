use std::path::PathBuf;

use thiserror::Error;
use textfsm_core::{TemplateError, TextFsmError};
use textfsm_table::TableError;

/// A fault raised while selecting templates or composing their tables.
#[derive(Debug, Error)]
pub enum CliTableError {
    #[error("no template found for attributes: {0}")]
    NoTemplateMatch(String),

    #[error("index file does not have a '{0}' column")]
    MissingIndexColumn(String),

    #[error("unknown key column '{0}'")]
    UnknownKey(String),

    #[error("invalid pattern '{pattern}' in index cell")]
    BadIndexPattern { pattern: String },

    #[error("cannot read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Parse(#[from] TextFsmError),

    #[error(transparent)]
    Table(#[from] TableError),
}
