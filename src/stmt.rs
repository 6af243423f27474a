use std::rc::Rc;

use crate::expr::{Expr, FunctionLiteral};
use crate::token::Token;

#[derive(Debug)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Break,

    Function {
        name: Token,
        literal: Rc<FunctionLiteral>,
    },

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Class {
        name: Token,
        superclass: Option<Token>,
        // Each method is a `Stmt::Function`.
        methods: Vec<Stmt>,
    },
}
