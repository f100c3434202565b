use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// A single lexical scope: a name→value map plus a link to the enclosing
/// scope.  Environments are shared (`Rc<RefCell<..>>`) because closures keep
/// the scope they captured alive and mutable after the block exits.
#[derive(Debug, Clone, Default)]
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

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Walk exactly `distance` enclosing links.  The resolver guarantees the
    /// chain is long enough; a short chain is reported, not unwrapped.
    pub fn ancestor(
        this: &Rc<RefCell<Environment>>,
        distance: usize,
        line: usize,
    ) -> Result<Rc<RefCell<Environment>>> {
        let mut environment = Rc::clone(this);

        for _ in 0..distance {
            let enclosing = environment.borrow().enclosing.clone();

            match enclosing {
                Some(parent) => environment = parent,
                None => {
                    return Err(LoxError::runtime(
                        line,
                        format!("No enclosing scope at distance {}.", distance),
                    ));
                }
            }
        }

        Ok(environment)
    }

    pub fn get_at(
        this: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value> {
        let scope = Environment::ancestor(this, distance, line)?;
        let value = scope.borrow().values.get(name).cloned();

        value.ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))
    }

    pub fn assign_at(
        this: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<()> {
        let scope = Environment::ancestor(this, distance, line)?;
        scope.borrow_mut().values.insert(name.to_string(), value);

        Ok(())
    }
}
