use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::class::QuillInstance;
use crate::environment::Environment;
use crate::error::Result;
use crate::expr::FunctionLiteral;
use crate::interpreter::{Interpreter, Signal};
use crate::value::Value;

/// A user function: the shared declaration plus the environment it closed
/// over. Methods are the same thing with a `this` frame spliced in by
/// [`QuillFunction::bind`].
pub struct QuillFunction {
    /// `None` for anonymous function expressions.
    name: Option<String>,
    literal: Rc<FunctionLiteral>,
    closure: Rc<RefCell<Environment>>,
    is_init: bool,
}

impl QuillFunction {
    pub fn new(
        name: Option<String>,
        literal: Rc<FunctionLiteral>,
        closure: Rc<RefCell<Environment>>,
        is_init: bool,
    ) -> Self {
        QuillFunction {
            name,
            literal,
            closure,
            is_init,
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.literal.params.len()
    }

    /// Clone this method with one extra scope binding `this` to the given
    /// instance.
    pub fn bind(&self, instance: QuillInstance) -> QuillFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));

        QuillFunction {
            name: self.name.clone(),
            literal: Rc::clone(&self.literal),
            closure: Rc::new(RefCell::new(environment)),
            is_init: self.is_init,
        }
    }

    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!(
            "Calling {} with {} argument(s)",
            self,
            arguments.len()
        );

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));

        for (param, argument) in self.literal.params.iter().zip(arguments) {
            environment.borrow_mut().define(&param.lexeme, argument);
        }

        let signal: Signal = interpreter.execute_block(&self.literal.body, environment)?;

        if self.is_init {
            // An initializer yields the instance it was bound to, whatever
            // its body returned.
            return Ok(Environment::get_at(&self.closure, 0, "this")
                .expect("initializer closure is missing 'this'"));
        }

        Ok(match signal {
            Signal::Return(value) => value,
            _ => Value::Nil,
        })
    }
}

impl fmt::Display for QuillFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fun {}>", name),
            None => write!(f, "<anonymous>"),
        }
    }
}
