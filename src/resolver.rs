//! Static resolution pass for the Quill interpreter.
//!
//! This module performs a single AST walk to:
//! 1. **Build lexical scopes**: maintains a stack of `HashMap<String,bool>`
//!    tracking declared (false) and fully defined (true) names in each nested
//!    block or function.
//! 2. **Enforce static rules**: reports errors such as redeclaration in the
//!    same scope, reading a variable in its own initializer, `return` outside
//!    of functions, and illegal use of `this` outside of class methods.
//!    Errors accumulate in the shared diagnostics sink; resolution keeps
//!    walking so a run surfaces as many static errors as possible.
//! 3. **Record binding distances**: for every name-bearing expression
//!    (`Variable`, `Assign`, `This`) found in a local scope, records its hop
//!    count in an id-keyed side table. Names found in no scope are globals
//!    and stay out of the table; the runtime looks those up by name.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{Diagnostics, QuillError};
use crate::expr::{Expr, FunctionLiteral};
use crate::stmt::Stmt;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances (locals vs. globals) keyed by expression id.
pub struct Resolver<'d> {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    locals: HashMap<usize, usize>,
    current_function: FunctionType,
    current_class: ClassType,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Resolver<'d> {
    pub fn new(diagnostics: &'d mut Diagnostics) -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            diagnostics,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    /// The distance map built by [`Resolver::resolve`].
    pub fn into_locals(self) -> HashMap<usize, usize> {
        self.locals
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                if let Some(super_tok) = superclass {
                    if super_tok.lexeme == name.lexeme {
                        self.diagnostics.report(QuillError::resolve(
                            super_tok,
                            "A class cannot inherit from itself.",
                        ));
                    }
                }

                self.declare(name);
                self.define(name);

                let enclosing_class: ClassType = self.current_class;
                self.current_class = ClassType::Class;

                // Methods resolve one scope in, with `this` pre-bound.
                self.begin_scope();
                self.scope_insert("this", true);

                for method in methods {
                    if let Stmt::Function {
                        name: m_name,
                        literal,
                    } = method
                    {
                        let kind = if m_name.lexeme == "init" {
                            FunctionType::Initializer
                        } else {
                            FunctionType::Method
                        };

                        self.resolve_function(kind, literal);
                    }
                }

                self.end_scope();

                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declared before the initializer runs so a self-reference
                // inside it is detectable.
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                self.define(name);
            }

            Stmt::Function { name, literal } => {
                // Declared and defined up front so the body can recurse.
                self.declare(name);
                self.define(name);

                self.resolve_function(FunctionType::Function, literal);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Break => {
                // Loop placement is enforced by the parser.
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.diagnostics.report(QuillError::resolve(
                        keyword,
                        "Cannot return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.diagnostics.report(QuillError::resolve(
                            name,
                            "Cannot read from local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value, .. } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Function(literal) => {
                self.resolve_function(FunctionType::Function, literal);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.diagnostics.report(QuillError::resolve(
                        keyword,
                        "Cannot use 'this' outside of a class.",
                    ));
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Get { object, .. } => {
                // Property names are dynamic; only the receiver resolves.
                self.resolve_expr(object);
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, kind: FunctionType, literal: &FunctionLiteral) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();

        for param in &literal.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &literal.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn scope_insert(&mut self, name: &str, defined: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), defined);
        }
    }

    fn declare(&mut self, name: &Token) {
        // The global scope is not on the stack and allows redeclaration.
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.diagnostics.report(QuillError::resolve(
                    name,
                    format!("Variable '{}' already declared in this scope.", name.lexeme),
                ));
            }

            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this name occurrence as a local at the depth of the first
    /// enclosing scope that declares it, or leave it for global lookup.
    fn resolve_local(&mut self, id: usize, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
