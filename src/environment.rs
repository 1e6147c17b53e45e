//! Namespace environment: global variables grouped in named modules, plus
//! the stack of local frames belonging to running program invocations.
//!
//! A name written `module.var` addresses `var` in an explicit module; an
//! undotted name addresses the current namespace. Only the last dot splits,
//! so module names may themselves be dotted (`math.trig.pi`).

use crate::Error;
use crate::value::{Program, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// A named container of global variables
#[derive(Debug, Clone, Default)]
pub struct Module {
    bindings: HashMap<String, Value>,
}

impl Module {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    /// Variable names sorted alphabetically
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Locals owned by one program invocation
#[derive(Debug)]
struct Frame {
    program: Rc<Program>,
    locals: HashMap<String, Value>,
}

#[derive(Debug)]
pub struct Environment {
    modules: HashMap<String, Module>,
    current: String,
    frames: Vec<Frame>,
}

impl Environment {
    /// An environment whose current namespace is `initial`, already created
    pub fn new(initial: &str) -> Self {
        let mut env = Environment {
            modules: HashMap::new(),
            current: initial.to_owned(),
            frames: Vec::new(),
        };
        env.create_or_get_module(initial);
        env
    }

    pub fn create_or_get_module(&mut self, name: &str) -> &mut Module {
        self.modules.entry(name.to_owned()).or_default()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// All module names, sorted
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn current_namespace(&self) -> &str {
        &self.current
    }

    /// Make `name` the current namespace, creating it if needed, and return
    /// the namespace that was current before
    pub fn switch_namespace(&mut self, name: &str) -> String {
        if name == self.current {
            return name.to_owned();
        }
        self.create_or_get_module(name);
        tracing::debug!(from = %self.current, to = name, "namespace switch");
        std::mem::replace(&mut self.current, name.to_owned())
    }

    pub fn set_variable(&mut self, module: &str, name: &str, value: Value) {
        self.create_or_get_module(module).define(name.to_owned(), value);
    }

    pub fn get_variable(&self, module: &str, name: &str) -> Result<Value, Error> {
        let found = self
            .modules
            .get(module)
            .ok_or_else(|| Error::NameNotFound(format!("module `{module}`")))?;
        found
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NameNotFound(format!("{module}.{name}")))
    }

    /// Split a possibly dotted name into (module, variable)
    pub fn resolve<'a>(&'a self, name: &'a str) -> (&'a str, &'a str) {
        match name.rsplit_once('.') {
            Some((module, var)) if !module.is_empty() && !var.is_empty() => (module, var),
            _ => (self.current.as_str(), name),
        }
    }

    /// Store under a possibly dotted name
    pub fn store(&mut self, name: &str, value: Value) {
        let (module, var) = self.resolve(name);
        let (module, var) = (module.to_owned(), var.to_owned());
        self.set_variable(&module, &var, value);
    }

    /// Recall a possibly dotted name
    pub fn recall(&self, name: &str) -> Result<Value, Error> {
        let (module, var) = self.resolve(name);
        self.get_variable(module, var)
    }

    /// Remove a possibly dotted name, failing if it was not bound
    pub fn purge(&mut self, name: &str) -> Result<Value, Error> {
        let (module, var) = self.resolve(name);
        let (module, var) = (module.to_owned(), var.to_owned());
        self.modules
            .get_mut(&module)
            .and_then(|m| m.remove(&var))
            .ok_or_else(|| Error::NameNotFound(format!("{module}.{var}")))
    }

    pub fn push_frame(&mut self, program: Rc<Program>) {
        self.frames.push(Frame {
            program,
            locals: HashMap::new(),
        });
        tracing::debug!(depth = self.frames.len(), "frame pushed");
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
        tracing::debug!(depth = self.frames.len(), "frame popped");
    }

    /// Number of active program invocations
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// The program whose invocation is innermost, if any
    pub fn current_program(&self) -> Option<&Rc<Program>> {
        self.frames.last().map(|frame| &frame.program)
    }

    pub fn set_local(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let frame = self.frames.last_mut().ok_or(Error::NoActiveFrame)?;
        frame.locals.insert(name.to_owned(), value);
        Ok(())
    }

    pub fn get_local(&self, name: &str) -> Result<Value, Error> {
        let frame = self.frames.last().ok_or(Error::NoActiveFrame)?;
        frame
            .locals
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NameNotFound(format!("local `{name}`")))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::value::val;
    use pretty_assertions::assert_eq;

    fn program() -> Rc<Program> {
        Rc::new(Program::new(vec![], "test", None))
    }

    #[test]
    fn test_variables_by_plain_and_dotted_name() {
        let mut env = Environment::new("main");
        env.store("x", val(1));
        env.store("math.pi", val(3));
        env.store("math.trig.half", val(5));

        assert_eq!(env.recall("x").unwrap(), val(1));
        assert_eq!(env.recall("main.x").unwrap(), val(1));
        assert_eq!(env.recall("math.pi").unwrap(), val(3));
        assert_eq!(env.get_variable("math.trig", "half").unwrap(), val(5));
        assert_eq!(env.module_names(), vec!["main", "math", "math.trig"]);

        // Undotted names never reach other modules
        assert!(matches!(env.recall("pi"), Err(Error::NameNotFound(_))));
        assert!(matches!(env.recall("nomodule.x"), Err(Error::NameNotFound(_))));
    }

    #[test]
    fn test_degenerate_dots_address_current_namespace() {
        let env = Environment::new("main");
        assert_eq!(env.resolve(".x"), ("main", ".x"));
        assert_eq!(env.resolve("x."), ("main", "x."));
        assert_eq!(env.resolve("a.b"), ("a", "b"));
    }

    #[test]
    fn test_switch_namespace_returns_previous() {
        let mut env = Environment::new("main");
        env.store("x", val(1));

        let previous = env.switch_namespace("work");
        assert_eq!(previous, "main");
        assert_eq!(env.current_namespace(), "work");
        assert!(env.recall("x").is_err());
        assert_eq!(env.recall("main.x").unwrap(), val(1));

        env.switch_namespace(&previous);
        assert_eq!(env.recall("x").unwrap(), val(1));
        // Modules are never deleted
        assert!(env.module("work").is_some());
    }

    #[test]
    fn test_purge() {
        let mut env = Environment::new("main");
        env.store("x", val(1));
        assert_eq!(env.purge("x").unwrap(), val(1));
        assert!(matches!(env.purge("x"), Err(Error::NameNotFound(_))));
    }

    #[test]
    fn test_locals_need_a_frame() {
        let mut env = Environment::new("main");
        assert_eq!(env.set_local("n", val(1)), Err(Error::NoActiveFrame));
        assert_eq!(env.get_local("n"), Err(Error::NoActiveFrame));

        env.push_frame(program());
        env.set_local("n", val(1)).unwrap();
        assert_eq!(env.get_local("n").unwrap(), val(1));
        assert!(matches!(env.get_local("m"), Err(Error::NameNotFound(_))));

        // A nested invocation starts with an empty frame
        env.push_frame(program());
        assert!(matches!(env.get_local("n"), Err(Error::NameNotFound(_))));
        env.pop_frame();
        assert_eq!(env.get_local("n").unwrap(), val(1));

        env.pop_frame();
        assert_eq!(env.get_local("n"), Err(Error::NoActiveFrame));
        assert_eq!(env.frame_depth(), 0);
    }

    #[test]
    fn test_locals_are_separate_from_globals() {
        let mut env = Environment::new("main");
        env.store("v", val("global"));
        env.push_frame(program());
        env.set_local("v", val("local")).unwrap();
        assert_eq!(env.recall("v").unwrap(), val("global"));
        assert_eq!(env.get_local("v").unwrap(), val("local"));
        assert!(env.current_program().is_some());
    }
}
