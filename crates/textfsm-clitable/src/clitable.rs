use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use fancy_regex::{Captures, Regex};
use log::debug;
use textfsm_core::{Record, RecordValue, Template, TextFsm, ValueOption};
use textfsm_table::{Cell, TextTable};

use crate::error::CliTableError;
use crate::index::{IndexLoader, IndexTable, shared_loader};

/// Device attributes used to pick an index row, keyed by index column.
pub type Attributes = HashMap<String, String>;

/// A table populated by parsing command output through auto-selected
/// templates.
///
/// The index file maps attribute patterns to a `:`-separated template
/// list; each template's rows are merged into one table, joined on the
/// superkey.
#[derive(Debug, Clone)]
pub struct CliTable {
    table: TextTable,
    keys: HashSet<String>,
    /// 1-based cursor used by [`CliTable::key_value`].
    pub row_index: usize,
    index: Arc<IndexTable>,
    template_dir: PathBuf,
    raw: String,
}

impl CliTable {
    /// Loads `index_file` from `template_dir` through the process-wide
    /// index cache.
    pub fn new(
        index_file: impl AsRef<Path>,
        template_dir: impl AsRef<Path>,
    ) -> Result<CliTable, CliTableError> {
        CliTable::with_loader(index_file, template_dir, shared_loader())
    }

    /// Same, but sharing (and populating) the given loader.
    pub fn with_loader(
        index_file: impl AsRef<Path>,
        template_dir: impl AsRef<Path>,
        loader: &IndexLoader,
    ) -> Result<CliTable, CliTableError> {
        let template_dir = template_dir.as_ref().to_path_buf();
        let path = template_dir.join(index_file.as_ref());
        let index = loader.load(&path, Some(pre_parse), Some(pre_compile))?;

        if !index.index().has_column("Template") {
            return Err(CliTableError::MissingIndexColumn("Template".to_string()));
        }

        Ok(CliTable {
            table: TextTable::new(),
            keys: HashSet::new(),
            row_index: 1,
            index,
            template_dir,
            raw: String::new(),
        })
    }

    pub fn table(&self) -> &TextTable {
        &self.table
    }

    pub fn index(&self) -> &IndexTable {
        &self.index
    }

    /// The raw input of the most recent [`CliTable::parse_cmd`].
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Key columns in header order.
    pub fn superkey(&self) -> Vec<String> {
        self.table
            .header()
            .iter()
            .filter(|column| self.keys.contains(*column))
            .cloned()
            .collect()
    }

    /// Marks additional columns as part of the superkey.
    pub fn add_keys<I>(&mut self, keys: I) -> Result<(), CliTableError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        for key in &keys {
            if !self.table.has_column(key) {
                return Err(CliTableError::UnknownKey(key.clone()));
            }
        }
        self.keys.extend(keys);
        Ok(())
    }

    /// Parses `data`, selecting templates from `attributes` via the index
    /// unless an explicit `:`-separated list is given, and replaces this
    /// table's content with the merged result.
    pub fn parse_cmd(
        &mut self,
        data: &str,
        attributes: &Attributes,
        templates: Option<&str>,
    ) -> Result<(), CliTableError> {
        self.raw = data.to_string();

        let templates = match templates {
            Some(templates) => templates.to_string(),
            None => {
                let row = self.index.row_match(attributes);
                if row == 0 {
                    return Err(CliTableError::NoTemplateMatch(describe(attributes)));
                }
                self.index
                    .index()
                    .cell(row, "Template")
                    .map(ToString::to_string)
                    .unwrap_or_default()
            }
        };
        debug!("parsing with templates '{templates}'");

        // Resolve every template file before touching our own state, so a
        // missing file leaves the previous parse intact.
        let mut sources = Vec::new();
        for name in templates.split(':') {
            let path = self.template_dir.join(name);
            let text = fs::read_to_string(&path).map_err(|source| CliTableError::Io {
                path,
                source,
            })?;
            sources.push(text);
        }

        self.table = TextTable::new();
        self.keys.clear();
        self.row_index = 1;

        let mut merged: Option<TextTable> = None;
        for text in &sources {
            let parsed = self.parse_cmd_item(data, text)?;
            match merged.as_mut() {
                None => merged = Some(parsed),
                Some(table) => {
                    let keys: Vec<String> = self.superkey_of(table);
                    let keys = if keys.is_empty() { None } else { Some(&keys[..]) };
                    table.extend(&parsed, keys)?;
                }
            }
        }
        self.table = merged.unwrap_or_default();
        Ok(())
    }

    /// Runs one template over the input and tables the records.
    fn parse_cmd_item(&mut self, data: &str, text: &str) -> Result<TextTable, CliTableError> {
        let template = Template::parse(text)?;

        // The first template that declares keys decides the superkey.
        if self.keys.is_empty() {
            self.keys = template
                .values_with_option(ValueOption::Key)
                .into_iter()
                .map(String::from)
                .collect();
        }

        let mut fsm = TextFsm::new(template);
        let records = fsm.parse_text(data, true)?;
        records_to_table(&fsm.header(), &records)
    }

    fn superkey_of(&self, table: &TextTable) -> Vec<String> {
        table
            .header()
            .iter()
            .filter(|column| self.keys.contains(*column))
            .cloned()
            .collect()
    }

    /// The key column values of the row at `row_index`, or the row number
    /// itself when no keys are defined.
    pub fn key_value(&self) -> Vec<String> {
        self.key_value_for(self.row_index)
    }

    pub fn key_value_for(&self, row: usize) -> Vec<String> {
        let keys = self.superkey();
        if keys.is_empty() {
            return vec![row.to_string()];
        }
        keys.iter()
            .filter_map(|key| self.table.cell(row, key))
            .map(ToString::to_string)
            .collect()
    }

    /// Sorts on the superkey when one exists, else on whole rows.
    pub fn sort(&mut self) {
        let keys = self.superkey();
        if keys.is_empty() {
            self.table.sort();
        } else {
            // Superkey columns come from the header, so they exist.
            let _ = self.table.sort_with(Some(&keys), false);
        }
    }

    /// Label-value serialization keyed by the superkey.
    pub fn label_value_table(&self) -> Result<String, CliTableError> {
        let keys = self.superkey();
        let keys = if keys.is_empty() { None } else { Some(&keys[..]) };
        Ok(self.table.label_value_table(keys)?)
    }
}

impl fmt::Display for CliTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.table, f)
    }
}

/// Builds a table from a parse header and its emitted records.
pub fn records_to_table<S: AsRef<str>>(
    header: &[S],
    records: &[Record],
) -> Result<TextTable, CliTableError> {
    let mut table = TextTable::with_header(header.iter().map(AsRef::as_ref))?;
    for record in records {
        table.append(record.iter().map(record_cell))?;
    }
    Ok(table)
}

fn record_cell(value: &RecordValue) -> Cell {
    match value {
        RecordValue::Text(text) => Cell::from(text.as_str()),
        RecordValue::List(items) => Cell::List(items.iter().map(ToString::to_string).collect()),
    }
}

/// Expands `[[...]]` completion shorthand on the `Command` column:
/// `sh[[ow]]` becomes `sh(o(w)?)?`, matching every prefix of the word.
fn pre_parse(column: &str, value: &str) -> String {
    if column == "Command" {
        expand_completion(value)
    } else {
        value.to_string()
    }
}

/// Template names are data, not patterns to match attributes against.
fn pre_compile(column: &str, value: &str) -> Option<String> {
    if column == "Template" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Rewrites each `[[word]]` group into right-nested optional groups.
pub fn expand_completion(pattern: &str) -> String {
    static COMPLETION: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\[.+?\]\]").expect("pattern is valid"));

    COMPLETION
        .replace_all(pattern, |caps: &Captures| {
            let matched = &caps[0];
            let inner = &matched[2..matched.len() - 2];
            let mut out = String::new();
            for c in inner.chars() {
                out.push('(');
                out.push(c);
            }
            out.push_str(&")?".repeat(inner.chars().count()));
            out
        })
        .into_owned()
}

fn describe(attributes: &Attributes) -> String {
    let mut pairs: Vec<_> = attributes.iter().collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
