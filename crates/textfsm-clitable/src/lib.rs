//! Template auto-selection and table composition.
//!
//! An index file (CSV) maps device attributes and command patterns to
//! template names; [`CliTable`] looks up the right templates for a
//! request, parses the command output through each, and merges the
//! per-template tables into one, joined on the superkey.

pub mod clitable;
pub mod error;
pub mod index;

pub use clitable::{Attributes, CliTable, expand_completion, records_to_table};
pub use error::CliTableError;
pub use index::{IndexLoader, IndexTable, PreCompile, PreParse, shared_loader};
