//! stackrpl - a stack-based ("reverse-Polish") scripting language runtime
//!
//! This crate implements the language runtime behind an interactive RPN shell:
//! a closed set of runtime values, a single shared operand stack, namespaces of
//! global variables plus per-invocation local frames, a reader that turns text
//! into nested program objects, and a tree-walking execution engine.
//!
//! ```text
//! 3 4 ADD                           # leaves 7
//! << 1 2 ADD >> EVAL                # leaves 3
//! IF 1 THEN "yes" ELSE "no" ENDIF   # leaves "yes"
//! [ 1 2 3 ] FOR 1 ADD ENDFOR        # leaves 2 3 4
//! ```
//!
//! ## Two ways to run a value
//!
//! *Structural execution* walks a value or a sequence of values: literals push
//! themselves (a `Program` is data here), control nodes run their bodies, and
//! commands are dispatched. *Invocation* (`EVAL`) runs a `Program`'s body inside
//! a fresh local frame, switching to the program's originating namespace and
//! restoring the caller's state afterwards, whether the body succeeds or fails.
//!
//! ## Error boundaries
//!
//! Errors abort execution up to the nearest catching boundary. The interactive
//! session is one; `IF`, `FOR` and `WHILE` are others: they report a failure in
//! their own condition or body and carry on with the enclosing sequence.
//! Program invocation never swallows errors.
//!
//! ## Modules
//!
//! - `value`: runtime values, rendering, truthiness, cloning and equality
//! - `stack`: the operand stack with typed, validate-before-pop accessors
//! - `environment`: namespaces, dotted names and local frames
//! - `reader`: tokenizer and recursive-descent structure builder
//! - `registry`: the name to command table consulted by the reader
//! - `evaluator`: the interpreter state and the execution engine
//! - `builtinops`: the core word library
//! - `config`: TOML configuration
//! - `repl`: the interactive session driver

use thiserror::Error;

/// Default limit on nested reader forms (lists, maps, programs, control forms)
pub const DEFAULT_MAX_READ_DEPTH: usize = 64;

/// Default limit on nested program invocations
///
/// Every invocation recurses through the engine on the native stack, so this
/// stays well below what a default thread stack can hold.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;

/// Name of the namespace an interactive session starts in
pub const INTERACTIVE_NAMESPACE: &str = "interactive";

/// A structured error describing a reader failure.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, context: Option<String>, found: Option<String>) -> Self {
        ParseError {
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a ParseError with a message but no context
    pub fn from_message(message: impl Into<String>) -> Self {
        Self::new(message, None, None)
    }

    /// Create a ParseError with context extracted from input at a given byte offset
    pub fn with_context(
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        let error_offset = error_offset.min(input.len());
        let prefix_chars = input[..floor_char_boundary(input, error_offset)]
            .chars()
            .count();
        let context_start = prefix_chars.saturating_sub(20);

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.chars().count() < input.chars().count() {
            display_context.push_str("[...]");
        }

        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(message, Some(display_context), found)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(found) = &self.found {
            write!(f, " (found `{found}`)")?;
        }
        if let Some(context) = &self.context {
            write!(f, "\n  Context: {context}")?;
        }
        Ok(())
    }
}

fn floor_char_boundary(input: &str, mut index: usize) -> usize {
    while index > 0 && !input.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Error taxonomy shared by the reader, the stack machine and the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("stack underflow: needed {needed} value(s), stack holds {depth}")]
    StackUnderflow { needed: usize, depth: usize },
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: String,
        actual: value::ValueKind,
    },
    #[error("name not found: {0}")]
    NameNotFound(String),
    #[error("no active frame: local variables exist only inside a running program")]
    NoActiveFrame,
    #[error("malformed token: {0}")]
    MalformedToken(ParseError),
    #[error("unterminated form: {0}")]
    UnterminatedForm(ParseError),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Create a TypeMismatch naming the expected variant(s) and the actual one
    pub fn type_mismatch(expected: impl Into<String>, actual: value::ValueKind) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Error::OperationFailed(message.into())
    }

    /// True when the reader ran out of input inside a form; an interactive
    /// driver answers this by asking for more lines.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::UnterminatedForm(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::OperationFailed(err.to_string())
    }
}

pub mod builtinops;
pub mod config;
pub mod environment;
pub mod evaluator;
pub mod reader;
pub mod registry;
pub mod repl;
pub mod stack;
pub mod value;

pub use config::{Config, DisplayOptions};
pub use evaluator::{InterruptFlag, Interpreter};
pub use repl::{Feed, Session};
pub use value::Value;
