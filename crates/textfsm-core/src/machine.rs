use std::sync::Arc;

use indexmap::IndexMap;
use log::trace;

use crate::error::TextFsmError;
use crate::record::{ListItem, Record, RecordValue};
use crate::rule::{LineOp, RecordOp, Rule};
use crate::template::Template;
use crate::value::{Value, ValueOption};

/// Verdict of a value's save-record callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveOutcome {
    Keep,
    SkipRecord,
}

/// Per-parse state of one value.
#[derive(Debug, Clone, Default)]
struct Slot {
    /// The current content; `None` until a capture assigns it.
    value: Option<RecordValue>,
    /// What `Filldown` restores on clear.
    filldown: Option<RecordValue>,
    /// The `List` accumulator.
    collected: Vec<ListItem>,
}

/// The state machine that drives input lines through a compiled template.
///
/// Owns all mutable per-parse state; the template itself is shared and
/// never modified. Results accumulate across [`TextFsm::parse_text`] calls
/// until [`TextFsm::reset`].
#[derive(Debug, Clone)]
pub struct TextFsm {
    template: Arc<Template>,
    slots: Vec<Slot>,
    state: String,
    result: Vec<Record>,
}

impl TextFsm {
    pub fn new(template: impl Into<Arc<Template>>) -> TextFsm {
        let template = template.into();
        let slots = vec![Slot::default(); template.values().len()];
        TextFsm {
            template,
            slots,
            state: "Start".to_string(),
            result: Vec::new(),
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Column names of emitted records.
    pub fn header(&self) -> Vec<&str> {
        self.template.header()
    }

    /// Returns to the `Start` state and discards captures and results.
    pub fn reset(&mut self) {
        self.state = "Start".to_string();
        self.result.clear();
        self.clear_all_record();
    }

    /// Runs `text` through the machine and returns all records emitted
    /// since the last reset.
    ///
    /// With `eof` set, reaching the end of input outside a terminal state
    /// performs one implicit record, unless the template declares an `EOF`
    /// state of its own. Pass `eof = false` when more text will follow.
    pub fn parse_text(&mut self, text: &str, eof: bool) -> Result<Vec<Record>, TextFsmError> {
        for line in text.lines() {
            self.check_line(line)?;
            if self.state == "End" || self.state == "EOF" {
                break;
            }
        }

        if self.state != "End" && !self.template.has_state("EOF") && eof {
            self.append_record();
        }

        Ok(self.result.clone())
    }

    /// Like [`TextFsm::parse_text`], with each row keyed by the header.
    pub fn parse_text_to_dicts(
        &mut self,
        text: &str,
        eof: bool,
    ) -> Result<Vec<IndexMap<String, RecordValue>>, TextFsmError> {
        let rows = self.parse_text(text, eof)?;
        let header = self.template.header();
        Ok(rows
            .into_iter()
            .map(|row| {
                header
                    .iter()
                    .map(|name| name.to_string())
                    .zip(row)
                    .collect()
            })
            .collect())
    }

    /// Tries the current state's rules in order against one line.
    fn check_line(&mut self, line: &str) -> Result<(), TextFsmError> {
        let template = Arc::clone(&self.template);
        for rule in template.rules(&self.state) {
            let captures = match rule.cell().try_match_start(line) {
                Ok(captures) => captures,
                Err(err) => {
                    return Err(TextFsmError::Match {
                        input_line: line.to_string(),
                        source: Box::new(err),
                    });
                }
            };
            let Some(captures) = captures else { continue };

            for name in rule.cell().regex().capture_names().flatten() {
                if let (Some(m), Some(index)) =
                    (captures.name(name), template.value_index(name))
                {
                    self.assign_var(&template, index, m.as_str());
                }
            }

            match rule.record_op() {
                RecordOp::Record => self.append_record(),
                RecordOp::Clear => self.clear_record(),
                RecordOp::Clearall => self.clear_all_record(),
                RecordOp::NoRecord => {}
            }

            match rule.line_op() {
                LineOp::Error => return Err(Self::halted(rule, line)),
                // Keep the line and resume with the next rule.
                LineOp::Continue => {}
                LineOp::Next => {
                    let target = rule.new_state();
                    if !target.is_empty() {
                        trace!("line {:?}: {} -> {target}", line, self.state);
                        self.state = target.to_string();
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    fn halted(rule: &Rule, line: &str) -> TextFsmError {
        if rule.new_state().is_empty() {
            TextFsmError::HaltedBare {
                rule_line: rule.line_num(),
                input_line: line.to_string(),
            }
        } else {
            TextFsmError::Halted {
                message: rule.new_state().to_string(),
                rule_line: rule.line_num(),
                input_line: line.to_string(),
            }
        }
    }

    /// Writes a captured group into its value and runs the assign hooks.
    fn assign_var(&mut self, template: &Template, index: usize, captured: &str) {
        let value = &template.values()[index];
        let slot = &mut self.slots[index];
        slot.value = Some(RecordValue::Text(captured.to_string()));

        for option in value.options() {
            match option {
                ValueOption::Filldown => slot.filldown = slot.value.clone(),
                ValueOption::List => slot.collected.push(list_item(value, captured)),
                ValueOption::Fillup if !captured.is_empty() => {
                    Self::fill_up(&mut self.result, index, captured);
                }
                _ => {}
            }
        }
    }

    /// Walks already-emitted rows upward, filling empty cells of `column`
    /// until a set one blocks the way.
    fn fill_up(result: &mut [Record], column: usize, captured: &str) {
        for row in result.iter_mut().rev() {
            if !row[column].is_empty() {
                break;
            }
            row[column] = RecordValue::Text(captured.to_string());
        }
    }

    /// Commits the current captures as a row, unless a `Required` value is
    /// missing or the whole row is empty.
    fn append_record(&mut self) {
        if self.slots.is_empty() {
            return;
        }

        let template = Arc::clone(&self.template);
        let mut row: Vec<Option<RecordValue>> = Vec::with_capacity(self.slots.len());
        for (index, value) in template.values().iter().enumerate() {
            match self.save_record_value(value, index) {
                SaveOutcome::SkipRecord => {
                    self.clear_record();
                    return;
                }
                SaveOutcome::Keep => row.push(self.slots[index].value.clone()),
            }
        }

        // A row of nothing but unset values and empty lists is noise, not
        // a record; note that it does not clear pending captures either.
        let absent = |cell: &Option<RecordValue>| match cell {
            None => true,
            Some(RecordValue::List(items)) => items.is_empty(),
            Some(RecordValue::Text(_)) => false,
        };
        if row.iter().all(absent) {
            return;
        }

        let row: Record = row
            .into_iter()
            .map(|cell| cell.unwrap_or_else(|| RecordValue::Text(String::new())))
            .collect();
        trace!("recording {row:?}");
        self.result.push(row);
        self.clear_record();
    }

    /// Runs a value's options in declaration order just before commit.
    fn save_record_value(&mut self, value: &Value, index: usize) -> SaveOutcome {
        let slot = &mut self.slots[index];
        for option in value.options() {
            match option {
                ValueOption::Required => {
                    if slot.value.as_ref().is_none_or(RecordValue::is_empty) {
                        return SaveOutcome::SkipRecord;
                    }
                }
                // Snapshot the accumulator; later clears must not reach
                // into emitted rows.
                ValueOption::List => {
                    slot.value = Some(RecordValue::List(slot.collected.clone()));
                }
                _ => {}
            }
        }
        SaveOutcome::Keep
    }

    /// Clears non-Filldown values.
    fn clear_record(&mut self) {
        let template = Arc::clone(&self.template);
        for (value, slot) in template.values().iter().zip(&mut self.slots) {
            slot.value = None;
            for option in value.options() {
                match option {
                    ValueOption::Filldown => slot.value = slot.filldown.clone(),
                    ValueOption::List => {
                        if !value.has_option(ValueOption::Filldown) {
                            slot.collected.clear();
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Clears every value, Filldown memories included.
    fn clear_all_record(&mut self) {
        let template = Arc::clone(&self.template);
        for (value, slot) in template.values().iter().zip(&mut self.slots) {
            slot.value = None;
            for option in value.options() {
                match option {
                    ValueOption::Filldown => slot.filldown = None,
                    ValueOption::List => slot.collected.clear(),
                    _ => {}
                }
            }
        }
    }
}

/// Builds the item a `List` value accumulates for one capture: the matched
/// text, or a map of nested named groups when the pattern declares them.
fn list_item(value: &Value, captured: &str) -> ListItem {
    if value.has_nested_groups()
        && let Some(cell) = value.nested_cell()
        && let Some(caps) = cell.match_start(captured)
    {
        let map: IndexMap<String, String> = cell
            .regex()
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        if !map.is_empty() {
            return ListItem::Map(map);
        }
    }
    ListItem::Text(captured.to_string())
}
