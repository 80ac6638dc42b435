use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use fancy_regex::Regex;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::error::TemplateError;
use crate::rule::{LINE_OPS, LineOp, RECORD_OPS, Rule};
use crate::value::{MAX_NAME_LEN, Value, ValueOption};

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#").expect("pattern is valid"));
static STATE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)$").expect("pattern is valid"));

/// A compiled template: the ordered value declarations and the state table.
///
/// Immutable once compiled; a [`crate::TextFsm`] owns all per-parse state,
/// so one template can back any number of parses.
#[derive(Debug, Clone)]
pub struct Template {
    values: Vec<Value>,
    states: IndexMap<String, Vec<Rule>>,
}

impl Template {
    /// Compiles template text.
    pub fn parse(text: &str) -> Result<Template, TemplateError> {
        let mut parser = Parser {
            lines: text.lines().collect(),
            pos: 0,
            values: Vec::new(),
            value_map: HashMap::new(),
            states: IndexMap::new(),
        };

        parser.parse_values()?;
        while parser.parse_state()?.is_some() {}

        let mut template = Template {
            values: parser.values,
            states: parser.states,
        };
        template.validate()?;
        Ok(template)
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Column names in declaration order.
    pub fn header(&self) -> Vec<&str> {
        self.values.iter().map(Value::name).collect()
    }

    /// Names of the values that carry `option`.
    pub fn values_with_option(&self, option: ValueOption) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| v.has_option(option))
            .map(Value::name)
            .collect()
    }

    pub fn value_index(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|v| v.name() == name)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// The rules of `name`, empty for undeclared states.
    pub fn rules(&self, name: &str) -> &[Rule] {
        self.states.get(name).map_or(&[], Vec::as_slice)
    }

    fn validate(&mut self) -> Result<(), TemplateError> {
        if !self.states.contains_key("Start") {
            return Err(TemplateError::MissingStart);
        }

        // 'End' and 'EOF' are terminal; declaring them with rules is an
        // authoring error.
        for name in ["End", "EOF"] {
            if self.states.get(name).is_some_and(|rules| !rules.is_empty()) {
                return Err(TemplateError::NonEmptyTerminal {
                    name: name.to_string(),
                });
            }
        }

        // A declared 'End' only marks the terminal; drop it from the table.
        self.states.shift_remove("End");

        for (state, rules) in &self.states {
            for rule in rules {
                if rule.line_op() == LineOp::Error {
                    continue;
                }
                let target = rule.new_state();
                if target.is_empty() || target == "End" || target == "EOF" {
                    continue;
                }
                if !self.states.contains_key(target) {
                    return Err(TemplateError::UndefinedTarget {
                        target: target.to_string(),
                        state: state.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Template {
    /// Reproduces the template, minus comments, in canonical form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.values.iter().join("\n"))?;
        for (name, rules) in &self.states {
            write!(f, "\n{name}\n")?;
            if !rules.is_empty() {
                writeln!(f, "{}", rules.iter().join("\n"))?;
            }
        }
        Ok(())
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::parse(s)
    }
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    values: Vec<Value>,
    value_map: HashMap<String, String>,
    states: IndexMap<String, Vec<Rule>>,
}

impl<'a> Parser<'a> {
    /// Consumes the next line, trailing whitespace removed.
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let line = self.lines.get(self.pos)?;
        self.pos += 1;
        Some((self.pos, line.trim_end()))
    }

    fn is_comment(line: &str) -> bool {
        COMMENT.is_match(line).unwrap_or(false)
    }

    /// Reads the contiguous `Value` block at the head of the template.
    fn parse_values(&mut self) -> Result<(), TemplateError> {
        while let Some((line_num, line)) = self.next_line() {
            // A blank line ends the block.
            if line.is_empty() {
                return Ok(());
            }
            if Self::is_comment(line) {
                continue;
            }

            if line.starts_with("Value ") {
                let value = Value::parse(line, line_num)?;
                if self.values.iter().any(|v| v.name() == value.name()) {
                    return Err(TemplateError::DuplicateValue {
                        name: value.name().to_string(),
                        line: line_num,
                    });
                }
                self.value_map
                    .insert(value.name().to_string(), value.template().to_string());
                self.values.push(value);
            } else if self.values.is_empty() {
                return Err(TemplateError::NoValues);
            } else {
                return Err(TemplateError::ExpectedBlankLine { line: line_num });
            }
        }
        Ok(())
    }

    /// Reads one state header and its rules; `None` once input runs out.
    fn parse_state(&mut self) -> Result<Option<String>, TemplateError> {
        let mut state_name = None;

        // Skip whitespace and comments until the state header.
        while let Some((line_num, line)) = self.next_line() {
            if line.is_empty() || Self::is_comment(line) {
                continue;
            }

            let valid = STATE_NAME.is_match(line).unwrap_or(false)
                && line.chars().count() <= MAX_NAME_LEN
                && !LINE_OPS.contains(&line)
                && !RECORD_OPS.contains(&line);
            if !valid {
                return Err(TemplateError::BadStateName {
                    name: line.to_string(),
                    line: line_num,
                });
            }
            if self.states.contains_key(line) {
                return Err(TemplateError::DuplicateState {
                    name: line.to_string(),
                    line: line_num,
                });
            }
            self.states.insert(line.to_string(), Vec::new());
            state_name = Some(line.to_string());
            break;
        }
        let Some(state_name) = state_name else {
            return Ok(None);
        };

        // Rules run until the next blank line.
        while let Some((line_num, line)) = self.next_line() {
            if line.is_empty() {
                break;
            }
            if Self::is_comment(line) {
                continue;
            }

            // One or two spaces, or a tab, then '^'.
            if !(line.starts_with(" ^") || line.starts_with("  ^") || line.starts_with("\t^")) {
                return Err(TemplateError::BadRulePrefix { line: line_num });
            }

            let rule = Rule::parse(line, line_num, Some(&self.value_map))?;
            if let Some(rules) = self.states.get_mut(&state_name) {
                rules.push(rule);
            }
        }

        Ok(Some(state_name))
    }
}
