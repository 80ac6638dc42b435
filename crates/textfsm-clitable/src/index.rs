use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use log::debug;
use textfsm_core::RegexCell;
use textfsm_table::{Cell, TextTable};

use crate::error::CliTableError;

/// Transforms a raw index cell before it is stored.
pub type PreParse = fn(column: &str, value: &str) -> String;

/// Picks the text a cell is compiled from; `None` excludes the column
/// from attribute matching.
pub type PreCompile = fn(column: &str, value: &str) -> Option<String>;

/// A CSV-backed catalog mapping attribute patterns to template names.
///
/// Keeps the raw table alongside a parallel grid of compiled cells; empty
/// and excluded cells compile to `None` and never constrain a match.
#[derive(Debug, Clone)]
pub struct IndexTable {
    index: TextTable,
    compiled: Vec<Vec<Option<RegexCell>>>,
}

impl IndexTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<IndexTable, CliTableError> {
        IndexTable::with_transforms(path, None, None)
    }

    pub fn with_transforms(
        path: impl AsRef<Path>,
        pre_parse: Option<PreParse>,
        pre_compile: Option<PreCompile>,
    ) -> Result<IndexTable, CliTableError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CliTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut index = TextTable::new();
        index.csv_to_table(BufReader::new(file))?;

        if let Some(pre_parse) = pre_parse {
            let header: Vec<String> = index.header().to_vec();
            for row in 1..=index.size() {
                for column in &header {
                    let raw = index
                        .cell(row, column)
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    index.set_cell(row, column, Cell::from(pre_parse(column, &raw)))?;
                }
            }
        }

        let mut compiled = Vec::with_capacity(index.size());
        for row in index.rows() {
            let mut cells = Vec::with_capacity(index.header().len());
            for (column, cell) in index.header().iter().zip(row.values()) {
                let raw = cell.to_string();
                let pattern = match pre_compile {
                    Some(pre_compile) => pre_compile(column, &raw),
                    None => Some(raw),
                };
                let compiled_cell = match pattern {
                    Some(pattern) if !pattern.is_empty() => Some(
                        RegexCell::new(pattern.as_str())
                            .map_err(|_| CliTableError::BadIndexPattern { pattern })?,
                    ),
                    _ => None,
                };
                cells.push(compiled_cell);
            }
            compiled.push(cells);
        }

        Ok(IndexTable { index, compiled })
    }

    /// The raw table, after `pre_parse` transforms.
    pub fn index(&self) -> &TextTable {
        &self.index
    }

    /// The compiled cell at (1-based row, column), if one constrains it.
    pub fn compiled_cell(&self, row: usize, column: &str) -> Option<&RegexCell> {
        let col = self.index.column_index(column)?;
        self.compiled.get(row.checked_sub(1)?)?.get(col)?.as_ref()
    }

    /// The first row whose compiled cells match every attribute present
    /// in both the map and the header; `0` when none does.
    ///
    /// Attribute keys without an index column are ignored, as are
    /// unconstrained cells.
    pub fn row_match(&self, attributes: &HashMap<String, String>) -> usize {
        'rows: for row in 1..=self.index.size() {
            for (key, value) in attributes {
                if let Some(cell) = self.compiled_cell(row, key)
                    && !cell.matches_start(value)
                {
                    continue 'rows;
                }
            }
            return row;
        }
        0
    }
}

/// A shared path-keyed cache of parsed index tables.
///
/// Construct one per scope that wants sharing; the process-wide instance
/// behind [`shared_loader`] backs the plain constructors. The first load
/// of a path wins and later loads observe it, so transforms must agree
/// per path.
#[derive(Debug, Default)]
pub struct IndexLoader {
    cache: Mutex<HashMap<PathBuf, Arc<IndexTable>>>,
}

impl IndexLoader {
    pub fn new() -> IndexLoader {
        IndexLoader::default()
    }

    pub fn load(
        &self,
        path: &Path,
        pre_parse: Option<PreParse>,
        pre_compile: Option<PreCompile>,
    ) -> Result<Arc<IndexTable>, CliTableError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = cache.get(path) {
            debug!("index cache hit for {}", path.display());
            return Ok(Arc::clone(found));
        }

        debug!("reading index {}", path.display());
        let table = Arc::new(IndexTable::with_transforms(path, pre_parse, pre_compile)?);
        cache.insert(path.to_path_buf(), Arc::clone(&table));
        Ok(table)
    }
}

/// The process-wide loader used when no explicit one is supplied.
pub fn shared_loader() -> &'static IndexLoader {
    static LOADER: LazyLock<IndexLoader> = LazyLock::new(IndexLoader::new);
    &LOADER
}
