//! One-shot pipeline driver shared by the CLI and the REPL.
//!
//! Runs scan → parse → resolve → interpret over a source string against a
//! persistent interpreter, so successive calls (REPL lines) share globals
//! and retained closures.
//!
//! # Example
//!
//! ```
//! use quill::runner::{Outcome, Runner};
//!
//! let mut output: Vec<u8> = Vec::new();
//! let mut runner = Runner::new(&mut output);
//!
//! assert_eq!(runner.run("print 1 + 2 * 3;"), Outcome::Success);
//! assert_eq!(output, b"7\n");
//! ```

use std::io::Write;

use log::info;

use crate::error::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;

/// What a run produced, for exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,

    /// Lexical, syntactic, or resolution diagnostics were reported.
    StaticError,

    /// Evaluation stopped at a runtime error.
    RuntimeError,
}

pub struct Runner<W: Write> {
    interpreter: Interpreter<W>,

    /// Carried across runs so every parse stamps fresh expression ids.
    next_expr_id: usize,
}

impl<W: Write> Runner<W> {
    pub fn new(out: W) -> Self {
        Runner {
            interpreter: Interpreter::new(out),
            next_expr_id: 0,
        }
    }

    /// Push one source text through the pipeline. Diagnostics go to stderr;
    /// a non-empty sink after any front-end phase stops before the next one.
    pub fn run(&mut self, source: &str) -> Outcome {
        let mut diagnostics = Diagnostics::new();

        let tokens: Vec<Token> = Scanner::new(source)
            .filter_map(|result| match result {
                Ok(token) => Some(token),

                Err(e) => {
                    diagnostics.report(e);
                    None
                }
            })
            .collect();

        if diagnostics.has_errors() {
            diagnostics.print_to_stderr();
            return Outcome::StaticError;
        }

        let statements: Vec<Stmt> = {
            let mut parser = Parser::new(tokens, self.next_expr_id, &mut diagnostics);
            let statements = parser.parse();
            self.next_expr_id = parser.next_id();
            statements
        };

        if diagnostics.has_errors() {
            diagnostics.print_to_stderr();
            return Outcome::StaticError;
        }

        let locals = {
            let mut resolver = Resolver::new(&mut diagnostics);
            resolver.resolve(&statements);
            resolver.into_locals()
        };

        if diagnostics.has_errors() {
            diagnostics.print_to_stderr();
            return Outcome::StaticError;
        }

        self.interpreter.note_locals(locals);

        match self.interpreter.interpret(&statements) {
            Ok(()) => Outcome::Success,

            Err(e) => {
                info!("Run aborted by runtime error");
                eprintln!("{}", e);
                Outcome::RuntimeError
            }
        }
    }
}
