use thiserror::Error;

/// A fault raised by a table mutator or renderer.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("row length {got} does not match header length {want}")]
    RowLength { want: usize, got: usize },

    #[error("missing column '{0}' in row mapping")]
    MissingColumn(String),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("column index {0} out of range")]
    ColumnIndex(isize),

    #[error("row index {0} out of range")]
    RowIndex(usize),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("no row where '{column}' equals '{value}'")]
    NoMatchingRow { column: String, value: String },

    #[error("width too narrow to display table")]
    WidthTooNarrow,

    #[error("word '{0}' does not fit in its column")]
    WordTooWide(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
