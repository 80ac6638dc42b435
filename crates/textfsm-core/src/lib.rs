//! Template-driven parsing of semi-structured text into records.
//!
//! A small declarative template language describes a finite state machine:
//! `Value` lines declare named captures (the columns of the output) and
//! state blocks hold rules that match input lines with regular expressions,
//! assign captures, and fire record and state-transition operators.
//!
//! ```
//! use textfsm_core::{Template, TextFsm};
//!
//! let template = Template::parse(
//!     "Value boo (.*)\n\nStart\n  ^$boo -> Next.Record\n\nEOF\n",
//! )?;
//! let mut fsm = TextFsm::new(template);
//! let rows = fsm.parse_text("Matching text\nAnd again", true)?;
//! assert_eq!(rows.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod machine;
pub mod record;
pub mod regex_cell;
pub mod rule;
pub mod template;
pub mod value;

pub use error::{TemplateError, TextFsmError};
pub use machine::TextFsm;
pub use record::{ListItem, Record, RecordValue};
pub use regex_cell::RegexCell;
pub use rule::{LineOp, RecordOp, Rule};
pub use template::Template;
pub use value::{MAX_NAME_LEN, Value, ValueOption};
