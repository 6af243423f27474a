//! Centralised error hierarchy for the **Quill interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) must convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! Every language-level variant renders as one diagnostic line in the shape
//! `[Line N] Error[ at '<lexeme>'| at end]: <message>`.
//!
//! The module **does not** print diagnostics itself; accumulation and
//! reporting go through [`Diagnostics`].

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuillError {
    /// Lexical (scanner) error with source line information.
    #[error("[Line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error, anchored to the offending token.
    #[error("[Line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("[Line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error("[Line {line}] Error{location}: {message}")]
    Runtime {
        message: String,
        location: String,
        line: usize,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl QuillError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        QuillError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        QuillError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: line={}, msg={}",
            token.line, message
        );

        QuillError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, msg={}",
            token.line, message
        );

        QuillError::Runtime {
            message,
            location: location_of(token),
            line: token.line,
        }
    }
}

/// Diagnostic location suffix for a token: `" at end"` for EOF, otherwise
/// `" at '<lexeme>'"`.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, QuillError>;

/// Shared sink the front-end phases accumulate errors into.
///
/// Each phase keeps going after an error so several diagnostics can be
/// reported per run; the pipeline checks [`Diagnostics::has_errors`] between
/// phases and stops before the next one when the sink is non-empty.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<QuillError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn report(&mut self, error: QuillError) {
        info!("Recording diagnostic: {}", error);

        self.errors.push(error);
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Write every accumulated diagnostic, one line each, to stderr.
    pub fn print_to_stderr(&self) {
        for error in &self.errors {
            eprintln!("{}", error);
        }
    }
}
