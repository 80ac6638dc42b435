use std::fmt;

use itertools::Itertools;

use crate::error::TemplateError;
use crate::regex_cell::RegexCell;

/// Hard cap on value and state identifiers.
pub const MAX_NAME_LEN: usize = 48;

/// The capabilities a `Value` declaration can attach to its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOption {
    /// Records where this value is empty are dropped.
    Required,
    /// The value keeps its previous setting across record boundaries.
    Filldown,
    /// Assignment back-fills the column of earlier rows until one is set.
    Fillup,
    /// The value is part of the row superkey.
    Key,
    /// Matches accumulate into a list instead of replacing each other.
    List,
}

impl ValueOption {
    pub const ALL: [ValueOption; 5] = [
        ValueOption::Required,
        ValueOption::Filldown,
        ValueOption::Fillup,
        ValueOption::Key,
        ValueOption::List,
    ];

    /// Option names are case sensitive.
    pub fn parse(name: &str) -> Option<ValueOption> {
        match name {
            "Required" => Some(ValueOption::Required),
            "Filldown" => Some(ValueOption::Filldown),
            "Fillup" => Some(ValueOption::Fillup),
            "Key" => Some(ValueOption::Key),
            "List" => Some(ValueOption::List),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueOption::Required => "Required",
            ValueOption::Filldown => "Filldown",
            ValueOption::Fillup => "Fillup",
            ValueOption::Key => "Key",
            ValueOption::List => "List",
        }
    }
}

impl fmt::Display for ValueOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named capture and its options; one column of the output.
///
/// Declared as `Value [Opt1,Opt2] NAME (REGEX)`. The pattern must be a
/// single outermost group; it is rewritten to `(?P<NAME>...)` for
/// interpolation into rule regexes.
#[derive(Debug, Clone)]
pub struct Value {
    name: String,
    pattern: String,
    template: String,
    options: Vec<ValueOption>,
    nested: Option<RegexCell>,
}

impl Value {
    /// Parses a `Value` declaration line.
    pub fn parse(line: &str, line_num: usize) -> Result<Value, TemplateError> {
        let tokens: Vec<&str> = line.split(' ').collect();
        if tokens.len() < 3 {
            return Err(TemplateError::ValueTooShort { line: line_num });
        }

        let mut options = Vec::new();
        let (name, pattern) = if tokens[2].starts_with('(') {
            // No option token; the second token is the name.
            (tokens[1], tokens[2..].join(" "))
        } else {
            for option in tokens[1].split(',') {
                let parsed =
                    ValueOption::parse(option).ok_or_else(|| TemplateError::UnknownOption {
                        name: option.to_string(),
                        line: line_num,
                    })?;
                if options.contains(&parsed) {
                    return Err(TemplateError::DuplicateOption {
                        name: option.to_string(),
                        line: line_num,
                    });
                }
                options.push(parsed);
            }
            (tokens[2], tokens[3..].join(" "))
        };

        if name.is_empty()
            || name.chars().count() > MAX_NAME_LEN
            || !name.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(TemplateError::BadValueName {
                name: name.to_string(),
                line: line_num,
            });
        }

        if !single_outer_group(&pattern) {
            return Err(TemplateError::UnbalancedPattern {
                pattern,
                line: line_num,
            });
        }

        let template = format!("(?P<{name}>{}", &pattern[1..]);

        // List values re-match their own pattern to pull nested named
        // groups out of the captured text.
        let nested = if options.contains(&ValueOption::List) {
            Some(
                RegexCell::new(pattern.as_str()).map_err(|err| TemplateError::BadRegex {
                    regex: pattern.clone(),
                    line: line_num,
                    reason: err.to_string(),
                })?,
            )
        } else {
            None
        };

        Ok(Value {
            name: name.to_string(),
            pattern,
            template,
            options,
            nested,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source pattern, outer parentheses included.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The pattern with its outer group named, as interpolated into rules.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Options in declaration order.
    pub fn options(&self) -> &[ValueOption] {
        &self.options
    }

    pub fn has_option(&self, option: ValueOption) -> bool {
        self.options.contains(&option)
    }

    /// The compiled source pattern of a `List` value, used for nested
    /// group extraction; `None` on non-list values.
    pub fn nested_cell(&self) -> Option<&RegexCell> {
        self.nested.as_ref()
    }

    /// Whether the `List` pattern carries groups beyond the outer one.
    pub fn has_nested_groups(&self) -> bool {
        // capture_names yields the implicit whole-match group too.
        self.nested
            .as_ref()
            .is_some_and(|cell| cell.regex().capture_names().count() > 2)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.options.is_empty() {
            write!(f, "Value {} {}", self.name, self.pattern)
        } else {
            write!(
                f,
                "Value {} {} {}",
                self.options.iter().join(","),
                self.name,
                self.pattern
            )
        }
    }
}

/// Checks that `pattern` is one outermost `(...)` group.
///
/// Backslash escapes neutralize the following character and brackets open
/// character classes, inside which parentheses are literals.
fn single_outer_group(pattern: &str) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    if chars.len() < 2 || chars[0] != '(' || chars[chars.len() - 1] != ')' {
        return false;
    }

    let mut depth = 0usize;
    let mut in_class = false;
    let mut escaped = false;
    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
                if depth == 0 && i != chars.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
