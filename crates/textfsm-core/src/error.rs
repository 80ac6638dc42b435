use thiserror::Error;

/// A fault found while compiling a template.
///
/// Every variant that originates from a template line carries the 1-based
/// line number so callers can point back into the source file.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("expect at least 3 tokens on line {line}")]
    ValueTooShort { line: usize },

    #[error("invalid value name '{name}' or name too long. Line: {line}")]
    BadValueName { name: String, line: usize },

    #[error("value '{pattern}' must be contained within a '()' pair. Line: {line}")]
    UnbalancedPattern { pattern: String, line: usize },

    #[error("unknown option '{name}'. Line: {line}")]
    UnknownOption { name: String, line: usize },

    #[error("duplicate option '{name}'. Line: {line}")]
    DuplicateOption { name: String, line: usize },

    #[error("duplicate declarations for value '{name}'. Line: {line}")]
    DuplicateValue { name: String, line: usize },

    #[error("no value definitions found")]
    NoValues,

    #[error("expected blank line after last value entry. Line: {line}")]
    ExpectedBlankLine { line: usize },

    #[error("invalid state name '{name}'. Line: {line}")]
    BadStateName { name: String, line: usize },

    #[error("duplicate state name '{name}'. Line: {line}")]
    DuplicateState { name: String, line: usize },

    #[error("missing white space or carat ('^') before rule. Line: {line}")]
    BadRulePrefix { line: usize },

    #[error("null data in rule. Line: {line}")]
    EmptyRule { line: usize },

    #[error("badly formatted rule '{rule}'. Line: {line}")]
    BadRule { rule: String, line: usize },

    #[error("duplicate or invalid variable substitution: '{expr}'. Line: {line}")]
    BadSubstitution { expr: String, line: usize },

    #[error("invalid regular expression: '{regex}'. Line: {line}. {reason}")]
    BadRegex {
        regex: String,
        line: usize,
        reason: String,
    },

    #[error("action '{op}' with new state {state} specified. Line: {line}")]
    ContinueWithState {
        op: String,
        state: String,
        line: usize,
    },

    #[error("alphanumeric characters only in state names. Line: {line}")]
    BadTargetState { line: usize },

    #[error("missing state 'Start'")]
    MissingStart,

    #[error("non-empty '{name}' state")]
    NonEmptyTerminal { name: String },

    #[error("state '{target}' not found, referenced in state '{state}'")]
    UndefinedTarget { target: String, state: String },
}

/// A fault raised while the state machine is consuming input.
///
/// These are unrecoverable: the parse aborts and the partial result is
/// discarded by the caller.
#[derive(Debug, Error)]
pub enum TextFsmError {
    /// An `Error` rule carrying a message fired.
    #[error("Error: {message}. Rule Line: {rule_line}. Input Line: {input_line}.")]
    Halted {
        message: String,
        rule_line: usize,
        input_line: String,
    },

    /// A bare `Error` rule fired.
    #[error("State Error raised. Rule Line: {rule_line}. Input Line: {input_line}")]
    HaltedBare {
        rule_line: usize,
        input_line: String,
    },

    /// The regex engine gave up on an input line (backtracking limit).
    #[error("cannot match input line: {input_line}")]
    Match {
        input_line: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },
}
