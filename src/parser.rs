//! Recursive-descent parser for the Quill grammar.
//!
//! One token of lookahead over the scanned token vector. Each grammar rule is
//! a method; precedence climbs from `assignment` down to `primary`. On a
//! syntax error the offending token is reported to the shared [`Diagnostics`]
//! sink, the current statement is abandoned, and [`Parser::synchronize`]
//! skips ahead to a likely statement boundary so one bad statement does not
//! hide errors in the rest of the input.

use std::rc::Rc;

use log::{debug, info};

use crate::error::{Diagnostics, QuillError, Result};
use crate::expr::{Expr, FunctionLiteral};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};

pub struct Parser<'d> {
    tokens: Vec<Token>,
    current: usize,

    /// Next identity stamp for name-bearing expressions. Seeded by the
    /// caller so ids stay unique across successive parses feeding the same
    /// interpreter.
    next_id: usize,

    /// Depth of enclosing loop bodies; `break` is only legal when positive.
    loop_depth: usize,

    diagnostics: &'d mut Diagnostics,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, first_id: usize, diagnostics: &'d mut Diagnostics) -> Self {
        info!("Initializing Parser with {} token(s)", tokens.len());
        Parser {
            tokens,
            current: 0,
            next_id: first_id,
            loop_depth: 0,
            diagnostics,
        }
    }

    /// Parse the whole token stream into a statement list. Statements that
    /// fail to parse are dropped; their errors live in the diagnostics sink.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!("Parsed {} top-level statement(s)", statements.len());

        statements
    }

    /// First expression id not handed out yet; callers persist this across
    /// runs so retained closures never alias a later expression.
    #[inline]
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    // ─────────────────────────────────────────────────────────────────────
    // Declarations and statements
    // ─────────────────────────────────────────────────────────────────────

    fn declaration(&mut self) -> Option<Stmt> {
        let result: Result<Stmt> = if self.match_tokens(&[TokenType::VAR]) {
            self.var_declaration()
        } else if self.match_tokens(&[TokenType::CLASS]) {
            self.class_declaration()
        } else if self.check(&TokenType::FUN) && self.check_next(&TokenType::IDENTIFIER) {
            // `fun` followed by `(` is an anonymous function expression and
            // falls through to `statement` instead.
            self.advance();
            self.function_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),

            Err(e) => {
                self.diagnostics.report(e);
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(&TokenType::IDENTIFIER, "Expected variable name.")?;

        let initializer: Option<Expr> = if self.match_tokens(&[TokenType::EQUAL]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            &TokenType::SEMICOLON,
            "Expected ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(&TokenType::IDENTIFIER, "Expected class name.")?;

        let superclass: Option<Token> = if self.match_tokens(&[TokenType::COLON]) {
            Some(self.consume(&TokenType::IDENTIFIER, "Expected superclass name.")?)
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "Expected '{' before class body.")?;

        let mut methods: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            let method_name: Token =
                self.consume(&TokenType::IDENTIFIER, "Expected method name.")?;
            let literal: Rc<FunctionLiteral> = self.function_literal("method name")?;

            methods.push(Stmt::Function {
                name: method_name,
                literal,
            });
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expected '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(&TokenType::IDENTIFIER, "Expected function name.")?;
        let literal: Rc<FunctionLiteral> = self.function_literal("function name")?;

        Ok(Stmt::Function { name, literal })
    }

    /// Parameter list and body shared by named functions, methods, and
    /// anonymous function expressions. The body is either a braced block or
    /// one single statement.
    fn function_literal(&mut self, after: &str) -> Result<Rc<FunctionLiteral>> {
        self.consume(
            &TokenType::LEFT_PAREN,
            format!("Expected '(' after {}.", after),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    let token: Token = self.peek().clone();
                    self.diagnostics.report(QuillError::parse(
                        &token,
                        "Cannot have more than 255 parameters.",
                    ));
                }

                params.push(self.consume(&TokenType::IDENTIFIER, "Expected parameter name.")?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;

        let (body, single_line) = if self.match_tokens(&[TokenType::LEFT_BRACE]) {
            (self.block()?, false)
        } else {
            (vec![self.statement()?], true)
        };

        Ok(Rc::new(FunctionLiteral {
            params,
            body,
            single_line,
        }))
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_tokens(&[TokenType::IF]) {
            return self.if_statement();
        }

        if self.match_tokens(&[TokenType::WHILE]) {
            return self.while_statement();
        }

        if self.match_tokens(&[TokenType::FOR]) {
            return self.for_statement();
        }

        if self.match_tokens(&[TokenType::RETURN]) {
            return self.return_statement();
        }

        if self.match_tokens(&[TokenType::BREAK]) {
            return self.break_statement();
        }

        if self.match_tokens(&[TokenType::PRINT]) {
            return self.print_statement();
        }

        if self.match_tokens(&[TokenType::LEFT_BRACE]) {
            return Ok(Stmt::Block(self.block()?));
        }

        self.expression_statement()
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);

        let else_branch: Option<Box<Stmt>> = if self.match_tokens(&[TokenType::ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(
            &TokenType::RIGHT_PAREN,
            "Expected ')' after while condition.",
        )?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        Ok(Stmt::While {
            condition,
            body: Box::new(body?),
        })
    }

    /// `for (init; cond; incr) body` lowers to
    /// `{ init; while (cond or true) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.match_tokens(&[TokenType::SEMICOLON]) {
            None
        } else if self.match_tokens(&[TokenType::VAR]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if self.check(&TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(&TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

        let increment: Option<Expr> = if self.check(&TokenType::RIGHT_PAREN) {
            None
        } else {
            Some(self.expression()?)
        };
        let paren: Token =
            self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        let mut body: Stmt = body?;

        if let Some(incr) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(incr)]);
        }

        let condition: Expr = condition.unwrap_or_else(|| {
            Expr::Literal(Token::new(TokenType::TRUE, "true".to_string(), paren.line))
        });

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if self.check(&TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(&TokenType::SEMICOLON, "Expected ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.loop_depth == 0 {
            debug!("'break' outside a loop at line {}", keyword.line);

            self.diagnostics.report(QuillError::parse(
                &keyword,
                "'break' must be inside of a loop body.",
            ));
        }

        self.consume(&TokenType::SEMICOLON, "Expected ';' after 'break'.")?;

        Ok(Stmt::Break)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expected ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expected '}' after block.")?;

        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expected ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions, lowest precedence first
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.or_expression()?;

        if self.match_tokens(&[
            TokenType::EQUAL,
            TokenType::PLUS_EQUAL,
            TokenType::MINUS_EQUAL,
        ]) {
            let op: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: self.fresh_id(),
                    name,
                    op,
                    value: Box::new(value),
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    op,
                    value: Box::new(value),
                }),

                _ => {
                    // Not an lvalue; keep the left-hand side and move on.
                    self.diagnostics
                        .report(QuillError::parse(&op, "Invalid assignment target."));

                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    fn or_expression(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.and_expression()?;

        while self.match_tokens(&[TokenType::PIPE_PIPE, TokenType::OR]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.and_expression()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and_expression(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.bitwise()?;

        while self.match_tokens(&[TokenType::AMP_AMP, TokenType::AND]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.bitwise()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn bitwise(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.match_tokens(&[TokenType::AMP, TokenType::PIPE, TokenType::CARET]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.match_tokens(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.addition()?;

        while self.match_tokens(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.addition()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn addition(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.multiplication()?;

        while self.match_tokens(&[TokenType::MINUS, TokenType::PLUS]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.multiplication()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn multiplication(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.match_tokens(&[TokenType::SLASH, TokenType::STAR]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::BANG, TokenType::MINUS]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.match_tokens(&[TokenType::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tokens(&[TokenType::DOT]) {
                let name: Token =
                    self.consume(&TokenType::IDENTIFIER, "Expected property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    let token: Token = self.peek().clone();
                    self.diagnostics.report(QuillError::parse(
                        &token,
                        "Cannot have more than 255 arguments.",
                    ));
                }

                arguments.push(self.expression()?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[
            TokenType::TRUE,
            TokenType::FALSE,
            TokenType::NULL,
            TokenType::NUMBER(0.0),
            TokenType::STRING(String::new()),
        ]) {
            return Ok(Expr::Literal(self.previous().clone()));
        }

        if self.match_tokens(&[TokenType::IDENTIFIER]) {
            return Ok(Expr::Variable {
                id: self.fresh_id(),
                name: self.previous().clone(),
            });
        }

        if self.match_tokens(&[TokenType::THIS]) {
            return Ok(Expr::This {
                id: self.fresh_id(),
                keyword: self.previous().clone(),
            });
        }

        if self.match_tokens(&[TokenType::FUN]) {
            return Ok(Expr::Function(self.function_literal("'fun'")?));
        }

        if self.match_tokens(&[TokenType::LEFT_PAREN]) {
            let expr: Expr = self.expression()?;
            self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(QuillError::parse(self.peek(), "Expected expression."))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Token plumbing
    // ─────────────────────────────────────────────────────────────────────

    /// Skip forward to a statement boundary after a syntax error.
    fn synchronize(&mut self) {
        debug!("Synchronizing after parse error");

        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::IF
                | TokenType::FOR
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,

                _ => {}
            }

            self.advance();
        }
    }

    #[inline]
    fn fresh_id(&mut self) -> usize {
        let id: usize = self.next_id;
        self.next_id += 1;
        id
    }

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn consume<S: Into<String>>(&mut self, token_type: &TokenType, msg: S) -> Result<Token> {
        if self.check(token_type) {
            return Ok(self.advance().clone());
        }

        Err(QuillError::parse(self.peek(), msg))
    }

    #[inline]
    fn check(&self, token_type: &TokenType) -> bool {
        !self.is_at_end() && &self.peek().token_type == token_type
    }

    #[inline]
    fn check_next(&self, token_type: &TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => &token.token_type == token_type,
            None => false,
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    #[inline]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline]
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }
}
