use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use fancy_regex::Regex;

use crate::error::TemplateError;
use crate::regex_cell::RegexCell;

/// What a matched rule does with the input line and the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    /// Consume the line; optionally move to a new state.
    Next,
    /// Keep the line and keep trying the remaining rules of this state.
    Continue,
    /// Abort the parse with an unrecoverable error.
    Error,
}

impl LineOp {
    fn parse(name: &str) -> Option<LineOp> {
        match name {
            "Next" => Some(LineOp::Next),
            "Continue" => Some(LineOp::Continue),
            "Error" => Some(LineOp::Error),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LineOp::Next => "Next",
            LineOp::Continue => "Continue",
            LineOp::Error => "Error",
        }
    }
}

/// What a matched rule does with the record being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOp {
    NoRecord,
    Record,
    Clear,
    Clearall,
}

impl RecordOp {
    fn parse(name: &str) -> Option<RecordOp> {
        match name {
            "NoRecord" => Some(RecordOp::NoRecord),
            "Record" => Some(RecordOp::Record),
            "Clear" => Some(RecordOp::Clear),
            "Clearall" => Some(RecordOp::Clearall),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordOp::NoRecord => "NoRecord",
            RecordOp::Record => "Record",
            RecordOp::Clear => "Clear",
            RecordOp::Clearall => "Clearall",
        }
    }
}

pub(crate) const LINE_OPS: [&str; 3] = ["Continue", "Next", "Error"];
pub(crate) const RECORD_OPS: [&str; 4] = ["Clear", "Clearall", "Record", "NoRecord"];

// The action is whatever follows the *last* " ->" on the line.
static MATCH_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<match>.*)(\s->(?P<action>.*))").expect("pattern is valid")
});

// Line operator with optional record operator, then an optional new state
// or quoted message.
static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s+(?P<ln_op>Continue|Next|Error)(\.(?P<rec_op>Clear|Clearall|Record|NoRecord))?(\s+(?P<new_state>\w+|".*"))?$"#,
    )
    .expect("pattern is valid")
});

// Record operator only.
static ACTION_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s+(?P<rec_op>Clear|Clearall|Record|NoRecord)(\s+(?P<new_state>\w+|".*"))?$"#)
        .expect("pattern is valid")
});

// Implicit default operators with an optional new state.
static ACTION_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s+(?P<new_state>\w+|".*"))?$"#).expect("pattern is valid")
});

/// One match-and-act instruction inside a state.
///
/// ```text
/// ^<regexp> -> Next.Record State2
/// ```
///
/// Implicit defaults are `Next.NoRecord`; explicitly written defaults are
/// kept apart so serialization reproduces the source.
#[derive(Debug, Clone)]
pub struct Rule {
    match_expr: String,
    cell: RegexCell,
    line_op: Option<LineOp>,
    record_op: Option<RecordOp>,
    new_state: String,
    line_num: usize,
}

impl Rule {
    /// Parses a rule line, substituting `${name}` / `$name` entries from
    /// `var_map` before compiling the regex.
    pub fn parse(
        line: &str,
        line_num: usize,
        var_map: Option<&HashMap<String, String>>,
    ) -> Result<Rule, TemplateError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(TemplateError::EmptyRule { line: line_num });
        }

        let split = MATCH_ACTION
            .captures(line)
            .ok()
            .flatten()
            .map(|caps| {
                (
                    caps.name("match").map_or("", |m| m.as_str()).to_string(),
                    caps.name("action").map_or("", |m| m.as_str()).to_string(),
                )
            });
        let match_expr = split
            .as_ref()
            .map_or_else(|| line.to_string(), |(m, _)| m.clone());

        let regex = match var_map {
            Some(vars) => {
                substitute(&match_expr, vars).ok_or_else(|| TemplateError::BadSubstitution {
                    expr: match_expr.clone(),
                    line: line_num,
                })?
            }
            None => match_expr.clone(),
        };

        let cell = RegexCell::new(regex.as_str()).map_err(|err| TemplateError::BadRegex {
            regex,
            line: line_num,
            reason: err.to_string(),
        })?;

        let mut rule = Rule {
            match_expr,
            cell,
            line_op: None,
            record_op: None,
            new_state: String::new(),
            line_num,
        };

        let Some((_, action)) = split else {
            return Ok(rule);
        };

        let caps = ACTION
            .captures(&action)
            .ok()
            .flatten()
            .or_else(|| ACTION_RECORD.captures(&action).ok().flatten())
            .or_else(|| ACTION_DEFAULT.captures(&action).ok().flatten())
            .ok_or_else(|| TemplateError::BadRule {
                rule: line.to_string(),
                line: line_num,
            })?;

        rule.line_op = caps.name("ln_op").and_then(|m| LineOp::parse(m.as_str()));
        rule.record_op = caps.name("rec_op").and_then(|m| RecordOp::parse(m.as_str()));
        rule.new_state = caps
            .name("new_state")
            .map_or(String::new(), |m| m.as_str().to_string());

        // Only 'Next' (or implicit 'Next') may carry a destination state;
        // 'Error' may carry a message instead.
        if rule.line_op == Some(LineOp::Continue) && !rule.new_state.is_empty() {
            return Err(TemplateError::ContinueWithState {
                op: "Continue".to_string(),
                state: rule.new_state,
                line: line_num,
            });
        }

        if rule.line_op != Some(LineOp::Error)
            && !rule.new_state.is_empty()
            && !rule
                .new_state
                .starts_with(|c: char| c.is_alphanumeric() || c == '_')
        {
            return Err(TemplateError::BadTargetState { line: line_num });
        }

        Ok(rule)
    }

    /// The raw match expression, before substitution.
    pub fn match_expr(&self) -> &str {
        &self.match_expr
    }

    /// The compiled regex the rule matches lines with.
    pub fn cell(&self) -> &RegexCell {
        &self.cell
    }

    /// The effective line operator (`Next` when implicit).
    pub fn line_op(&self) -> LineOp {
        self.line_op.unwrap_or(LineOp::Next)
    }

    /// The effective record operator (`NoRecord` when implicit).
    pub fn record_op(&self) -> RecordOp {
        self.record_op.unwrap_or(RecordOp::NoRecord)
    }

    /// Destination state, or the quoted message of an `Error` rule; empty
    /// means "stay in the current state".
    pub fn new_state(&self) -> &str {
        &self.new_state
    }

    pub fn line_num(&self) -> usize {
        self.line_num
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operation = String::new();
        if let Some(op) = self.line_op {
            operation.push_str(op.name());
        }
        if self.line_op.is_some() && self.record_op.is_some() {
            operation.push('.');
        }
        if let Some(op) = self.record_op {
            operation.push_str(op.name());
        }

        if operation.is_empty() && self.new_state.is_empty() {
            return write!(f, "  {}", self.match_expr);
        }

        let new_state = if !operation.is_empty() && !self.new_state.is_empty() {
            format!(" {}", self.new_state)
        } else {
            self.new_state.clone()
        };

        write!(f, "  {} -> {operation}{new_state}", self.match_expr)
    }
}

/// Expands `$$`, `$name` and `${name}` in a match expression.
///
/// Returns `None` on a dangling or malformed `$` and on names missing from
/// `vars`, mirroring shell-style template substitution.
fn substitute(expr: &str, vars: &HashMap<String, String>) -> Option<String> {
    fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }
    fn is_ident(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return None,
                    }
                }
                let mut name_chars = name.chars();
                if !name_chars.next().is_some_and(is_ident_start) || !name_chars.all(is_ident) {
                    return None;
                }
                out.push_str(vars.get(&name)?);
            }
            Some(&c) if is_ident_start(c) => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_ident(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                out.push_str(vars.get(&name)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::{LineOp, RecordOp, Rule};
    use crate::error::TemplateError;

    fn rule(line: &str) -> Result<Rule, TemplateError> {
        Rule::parse(line, 1, None)
    }

    #[test]
    fn bare_rule_has_implicit_defaults() {
        let r = rule("  ^A beer called ${beer}").unwrap();
        assert_eq!(r.match_expr(), "^A beer called ${beer}");
        assert_eq!(r.line_op(), LineOp::Next);
        assert_eq!(r.record_op(), RecordOp::NoRecord);
        assert_eq!(r.new_state(), "");
    }

    #[test]
    fn explicit_operators() {
        let r = rule("  ^A beer called ${beer} -> Next").unwrap();
        assert_eq!(r.line_op(), LineOp::Next);
        assert_eq!(r.new_state(), "");

        let r = rule("  ^A beer called ${beer} -> Continue.Record").unwrap();
        assert_eq!(r.line_op(), LineOp::Continue);
        assert_eq!(r.record_op(), RecordOp::Record);

        let r = rule("  ^A beer called ${beer} -> Next.NoRecord End").unwrap();
        assert_eq!(r.line_op(), LineOp::Next);
        assert_eq!(r.record_op(), RecordOp::NoRecord);
        assert_eq!(r.new_state(), "End");
    }

    #[rstest]
    #[case("  ^A beer called ${beer} -> Next Next Next")]
    #[case("  ^A beer called ${beer} -> Boo.hoo")]
    #[case("  ^A beer called ${beer} -> Continue.Record $Hi")]
    #[case("  ^b -> Record.Next")]
    fn badly_formatted_actions(#[case] line: &str) {
        assert!(matches!(
            Rule::parse(line, 1, None),
            Err(TemplateError::BadRule { .. })
        ));
    }

    #[test]
    fn continue_may_not_change_state() {
        assert!(matches!(
            rule("^.* -> Continue Start"),
            Err(TemplateError::ContinueWithState { .. })
        ));
        assert!(matches!(
            rule("  ^b -> Continue End"),
            Err(TemplateError::ContinueWithState { .. })
        ));
    }

    #[test]
    fn only_error_takes_a_quoted_message() {
        let r = rule(r#"  ^ -> Error "hi there""#).unwrap();
        assert_eq!(r.to_string(), r#"  ^ -> Error "hi there""#);
        assert!(matches!(
            rule(r#"^.* -> Next "Hello World""#),
            Err(TemplateError::BadTargetState { .. })
        ));
    }

    #[rstest]
    #[case("  ^A beer called ${beer} -> Record End")]
    #[case("  ^A beer called ${beer} -> End")]
    #[case("  ^A beer called ${beer} -> Next.NoRecord End")]
    #[case("  ^A beer called ${beer} -> Clear End")]
    #[case(r#"  ^A beer called ${beer} -> Error "Hello World""#)]
    fn display_reproduces_the_source(#[case] line: &str) {
        assert_eq!(rule(line).unwrap().to_string(), line);
    }

    #[test]
    fn action_spacing_is_normalized() {
        for line in [
            "  ^Hello World -> Boo",
            "  ^Hello World ->  Boo",
            "  ^Hello World ->   Boo",
        ] {
            assert_eq!(rule(line).unwrap().to_string(), "  ^Hello World -> Boo");
        }
        // A '->' without a leading space belongs to the match expression.
        assert_eq!(
            rule("  A simple line-> Boo -> Next").unwrap().to_string(),
            "  A simple line-> Boo -> Next"
        );
    }

    #[test]
    fn substitution_uses_the_value_map() {
        let vars = HashMap::from([
            ("beer".to_string(), r"(?P<beer>\S+)".to_string()),
            ("hi".to_string(), r"(?P<hi>\w+)".to_string()),
        ]);
        let r = Rule::parse("  ^A $hi called ${beer}", 1, Some(&vars)).unwrap();
        assert_eq!(r.match_expr(), "^A $hi called ${beer}");
        assert_eq!(r.cell().pattern(), r"^A (?P<hi>\w+) called (?P<beer>\S+)");

        // '$$' is a literal dollar, here an end anchor.
        let r = Rule::parse(r"  ^\s*$$ -> Record", 1, Some(&vars)).unwrap();
        assert_eq!(r.cell().pattern(), r"^\s*$");

        // Unknown names and dangling '$' fail.
        assert!(matches!(
            Rule::parse("  ^$bogus", 1, Some(&vars)),
            Err(TemplateError::BadSubstitution { .. })
        ));
        assert!(matches!(
            Rule::parse("  ^ends with $", 1, Some(&vars)),
            Err(TemplateError::BadSubstitution { .. })
        ));
    }

    #[test]
    fn unicode_match_expressions_survive() {
        let r = rule("  ^A beer called ${beer}Δ").unwrap();
        assert_eq!(r.match_expr(), "^A beer called ${beer}Δ");
        assert_eq!(r.line_op(), LineOp::Next);
    }
}
