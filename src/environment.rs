use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One lexical scope: a name→value map plus a shared, non-owning link to the
/// enclosing scope. Closures and bound methods keep their capture chain
/// alive through the `Rc`.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look up a name in this scope only. Distance-resolved reads and global
    /// reads never walk the chain implicitly.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Overwrite a name in this scope only. Returns false when undefined.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }

    /// Look up a name anywhere on the chain, innermost first.
    pub fn search(env: &Rc<RefCell<Environment>>, name: &str) -> Option<Value> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        loop {
            if let Some(value) = current.borrow().get(name) {
                return Some(value);
            }

            let next = current.borrow().enclosing.as_ref().map(Rc::clone);
            match next {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// The scope exactly `distance` parent hops away.
    pub fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Rc<RefCell<Environment>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let parent = current
                .borrow()
                .enclosing
                .as_ref()
                .map(Rc::clone)
                .expect("resolved distance exceeds environment chain");
            current = parent;
        }

        current
    }

    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        Environment::ancestor(env, distance).borrow().get(name)
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        Environment::ancestor(env, distance)
            .borrow_mut()
            .assign(name, value)
    }
}
