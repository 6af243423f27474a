use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::class::QuillClass;
use crate::environment::Environment;
use crate::error::{QuillError, Result};
use crate::expr::Expr;
use crate::function::QuillFunction;
use crate::natives;
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local control flow threaded through every statement executor.
/// `Return` unwinds to the nearest function call, `Break` to the nearest
/// loop; blocks pass both through after restoring their environment.
#[derive(Debug)]
pub enum Signal {
    None,
    Break,
    Return(Value),
}

/// Tree-walking evaluator. Program output goes through the `out` sink so
/// callers (CLI, REPL, tests) decide where prints land.
pub struct Interpreter<W: Write> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,

    /// Resolver-produced side table: expression id → scope hops.
    /// Ids absent here are globals, looked up by name at runtime.
    locals: HashMap<usize, usize>,

    out: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));
        natives::install(&globals);

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Merge a resolution pass's bindings. Ids are globally unique across
    /// parses, so extending never clobbers a live closure's entry.
    pub fn note_locals(&mut self, locals: HashMap<usize, usize>) {
        debug!("Recording {} resolved local binding(s)", locals.len());

        self.locals.extend(locals);
    }

    /// Run a program. The first runtime error unwinds out of here; the
    /// caller reports it and abandons the remaining statements.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            self.execute(statement)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Signal::None)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;

                Ok(Signal::None)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = if let Some(expr) = initializer {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Signal::None)
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::None)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Signal::None => {}

                        Signal::Break => break,

                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }

                Ok(Signal::None)
            }

            Stmt::Break => Ok(Signal::Break),

            Stmt::Function { name, literal } => {
                let function = QuillFunction::new(
                    Some(name.lexeme.clone()),
                    Rc::clone(literal),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Function(Rc::new(function)));

                Ok(Signal::None)
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Signal::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Token>,
        methods: &[Stmt],
    ) -> Result<Signal> {
        let superclass_value: Option<QuillClass> = match superclass {
            Some(super_name) => {
                match Environment::search(&self.environment, &super_name.lexeme) {
                    Some(Value::Class(class)) => Some(class),

                    Some(_) => {
                        return Err(QuillError::runtime(
                            super_name,
                            "Superclass must be a class.",
                        ))
                    }

                    None => {
                        return Err(QuillError::runtime(
                            super_name,
                            format!("{} is undefined.", super_name.lexeme),
                        ))
                    }
                }
            }

            None => None,
        };

        // The name is visible (as null) while methods capture the scope, so
        // method bodies can refer to the class being defined.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let mut method_map: HashMap<String, Rc<QuillFunction>> = HashMap::new();

        for method in methods {
            if let Stmt::Function {
                name: method_name,
                literal,
            } = method
            {
                let is_init: bool = method_name.lexeme == "init";

                let function = QuillFunction::new(
                    Some(method_name.lexeme.clone()),
                    Rc::clone(literal),
                    Rc::clone(&self.environment),
                    is_init,
                );

                method_map.insert(method_name.lexeme.clone(), Rc::new(function));
            }
        }

        let class = QuillClass::new(name.lexeme.clone(), superclass_value, method_map);

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(class));

        Ok(Signal::None)
    }

    /// Run statements in the given environment, restoring the previous one
    /// on every exit path: fall-through, Break/Return unwind, and errors.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Signal> {
        let previous: Rc<RefCell<Environment>> =
            std::mem::replace(&mut self.environment, environment);

        let mut signal: Signal = Signal::None;

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Signal::None) => {}

                Ok(s) => {
                    signal = s;
                    break;
                }

                Err(e) => {
                    self.environment = previous;
                    return Err(e);
                }
            }
        }

        self.environment = previous;

        Ok(signal)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(token) => self.evaluate_literal(token),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { op, right } => self.evaluate_unary(op, right),

            Expr::Binary { left, op, right } => self.evaluate_binary(left, op, right),

            Expr::Logical { left, op, right } => {
                let left_val: Value = self.evaluate(left)?;

                match op.token_type {
                    TokenType::OR | TokenType::PIPE_PIPE => {
                        if left_val.is_truthy() {
                            Ok(left_val)
                        } else {
                            self.evaluate(right)
                        }
                    }

                    _ => {
                        if !left_val.is_truthy() {
                            Ok(left_val)
                        } else {
                            self.evaluate(right)
                        }
                    }
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign {
                id,
                name,
                op,
                value,
            } => {
                let mut new_value: Value = self.evaluate(value)?;

                if op.token_type != TokenType::EQUAL {
                    // `+=`/`-=` read the current binding first; both sides
                    // must be numbers.
                    let current: Value = self.look_up_variable(*id, name)?;

                    let (a, b) = match (&current, &new_value) {
                        (Value::Number(a), Value::Number(b)) => (*a, *b),

                        _ => return Err(QuillError::runtime(op, "Operands must be a numbers.")),
                    };

                    new_value = Value::Number(match op.token_type {
                        TokenType::PLUS_EQUAL => a + b,
                        _ => a - b,
                    });
                }

                self.assign_variable(*id, name, new_value.clone())?;

                Ok(new_value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee_val, args, paren)
            }

            Expr::Function(literal) => {
                let function = QuillFunction::new(
                    None,
                    Rc::clone(literal),
                    Rc::clone(&self.environment),
                    false,
                );

                Ok(Value::Function(Rc::new(function)))
            }

            Expr::Get { object, name } => {
                let object_val: Value = self.evaluate(object)?;

                match object_val {
                    Value::Instance(instance) => instance.get(&name.lexeme).ok_or_else(|| {
                        QuillError::runtime(
                            name,
                            format!("Property '{}' is undefined.", name.lexeme),
                        )
                    }),

                    _ => Err(QuillError::runtime(
                        name,
                        "Only instances have properties.",
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                op,
                value,
            } => {
                if op.token_type != TokenType::EQUAL {
                    // Compound assignment never targets a property.
                    return Err(QuillError::runtime(op, "Invalid assignment target."));
                }

                let object_val: Value = self.evaluate(object)?;

                match object_val {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;
                        instance.set(&name.lexeme, value.clone());

                        Ok(value)
                    }

                    _ => Err(QuillError::runtime(name, "Only instances have fields.")),
                }
            }
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NULL => Ok(Value::Nil),

            _ => Err(QuillError::runtime(token, "Invalid literal.")),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> Result<Value> {
        let value: Value = self.evaluate(right)?;

        match op.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(QuillError::runtime(op, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!value.is_truthy())),

            _ => Err(QuillError::runtime(op, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match op.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                // A string on the left concatenates with anything,
                // stringified.
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),

                _ => Err(QuillError::runtime(op, "Invalid operand(s) for '+'.")),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(QuillError::runtime(op, "Operands must be a numbers.")),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(QuillError::runtime(op, "Operands must be a numbers.")),
            },

            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(QuillError::runtime(op, "Operands must be a numbers.")),
            },

            // Bitwise operators work on the 32-bit truncation of their
            // operands and come back as numbers.
            TokenType::AMP => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    Ok(Value::Number(((a as i32) & (b as i32)) as f64))
                }

                _ => Err(QuillError::runtime(op, "Operands must be a numbers.")),
            },

            TokenType::PIPE => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    Ok(Value::Number(((a as i32) | (b as i32)) as f64))
                }

                _ => Err(QuillError::runtime(op, "Operands must be a numbers.")),
            },

            TokenType::CARET => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    Ok(Value::Number(((a as i32) ^ (b as i32)) as f64))
                }

                _ => Err(QuillError::runtime(op, "Operands must be a numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a < b)),

                _ => Err(QuillError::runtime(
                    op,
                    "Both operands must be comparable to each other.",
                )),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(QuillError::runtime(
                    op,
                    "Both operands must be comparable to each other.",
                )),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a > b)),

                _ => Err(QuillError::runtime(
                    op,
                    "Both operands must be comparable to each other.",
                )),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(QuillError::runtime(
                    op,
                    "Both operands must be comparable to each other.",
                )),
            },

            _ => Err(QuillError::runtime(op, "Invalid binary operator.")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Variable access
    // ─────────────────────────────────────────────────────────────────────

    fn look_up_variable(&self, id: usize, name: &Token) -> Result<Value> {
        let value: Option<Value> = if let Some(&distance) = self.locals.get(&id) {
            Environment::get_at(&self.environment, distance, &name.lexeme)
        } else {
            self.globals.borrow().get(&name.lexeme)
        };

        value.ok_or_else(|| {
            QuillError::runtime(name, format!("{} is undefined.", name.lexeme))
        })
    }

    fn assign_variable(&mut self, id: usize, name: &Token, value: Value) -> Result<()> {
        let written: bool = if let Some(&distance) = self.locals.get(&id) {
            Environment::assign_at(&self.environment, distance, &name.lexeme, value)
        } else {
            self.globals.borrow_mut().assign(&name.lexeme, value)
        };

        if written {
            Ok(())
        } else {
            Err(QuillError::runtime(
                name,
                format!("{} is undefined.", name.lexeme),
            ))
        }
    }

    fn call_value(&mut self, callee: Value, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        match callee {
            Value::NativeFunction { arity, func, .. } => {
                self.check_arity(arity, arguments.len(), paren)?;

                func(&arguments).map_err(|message| QuillError::runtime(paren, message))
            }

            Value::Function(function) => {
                self.check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments)
            }

            Value::Class(class) => {
                self.check_arity(class.arity(), arguments.len(), paren)?;

                class.construct(self, arguments)
            }

            _ => Err(QuillError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    fn check_arity(&self, expected: usize, got: usize, paren: &Token) -> Result<()> {
        if expected != got {
            return Err(QuillError::runtime(
                paren,
                format!("Expected {} arguments but got {}.", expected, got),
            ));
        }

        Ok(())
    }
}
