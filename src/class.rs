use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::error::Result;
use crate::function::QuillFunction;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Runtime class object: name, optional superclass, and method table.
/// Cheap to clone; every clone shares the same underlying class.
#[derive(Clone)]
pub struct QuillClass(Rc<Class>);

struct Class {
    name: String,
    superclass: Option<QuillClass>,
    methods: HashMap<String, Rc<QuillFunction>>,
}

impl QuillClass {
    pub fn new(
        name: String,
        superclass: Option<QuillClass>,
        methods: HashMap<String, Rc<QuillFunction>>,
    ) -> Self {
        QuillClass(Rc::new(Class {
            name,
            superclass,
            methods,
        }))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Method lookup walks the inheritance chain upward.
    pub fn find_method(&self, name: &str) -> Option<Rc<QuillFunction>> {
        match self.0.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),

            None => match &self.0.superclass {
                Some(parent) => parent.find_method(name),
                None => None,
            },
        }
    }

    /// A class called as a constructor takes as many arguments as its
    /// `init` method, or none.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    /// Construction: fresh instance, then the bound `init` (own or
    /// inherited) runs with the constructor arguments.
    pub fn construct<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Constructing instance of {}", self.name());

        let instance = QuillInstance::new(self.clone());

        if let Some(init) = self.find_method("init") {
            init.bind(instance.clone()).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl PartialEq for QuillClass {
    fn eq(&self, other: &QuillClass) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Runtime object: a class reference plus a mutable property map.
#[derive(Clone)]
pub struct QuillInstance(Rc<RefCell<Instance>>);

struct Instance {
    class: QuillClass,
    fields: HashMap<String, Value>,
}

impl QuillInstance {
    pub fn new(class: QuillClass) -> Self {
        QuillInstance(Rc::new(RefCell::new(Instance {
            class,
            fields: HashMap::new(),
        })))
    }

    pub fn class_name(&self) -> String {
        self.0.borrow().class.name().to_string()
    }

    /// Fields shadow methods; methods come back bound to this instance.
    pub fn get(&self, name: &str) -> Option<Value> {
        let this = self.0.borrow();

        if let Some(value) = this.fields.get(name) {
            return Some(value.clone());
        }

        this.class
            .find_method(name)
            .map(|method| Value::Function(Rc::new(method.bind(self.clone()))))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.0.borrow_mut().fields.insert(name.to_string(), value);
    }
}

impl PartialEq for QuillInstance {
    fn eq(&self, other: &QuillInstance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
