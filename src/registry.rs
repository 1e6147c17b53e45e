//! Command registry: the live table mapping words to behavior.
//!
//! The reader consults the registry when it meets a bare word, so registering a
//! word makes it visible to text read afterwards; values already read keep the
//! command references they resolved at the time.

use crate::Error;
use crate::evaluator::Interpreter;
use crate::reader::lexer::{RESERVED_WORDS, is_valid_word};
use crate::value::{Program, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Category label given to programs registered at run time
pub const USER_CATEGORY: &str = "user";

/// A native behavior invoked with the whole interpreter state.
///
/// Following the calling convention, an implementation reads its operands
/// from the top of the stack, validates count and variants before popping
/// anything, and pushes zero or more results.
pub trait Builtin {
    fn invoke(&self, interp: &mut Interpreter) -> Result<(), Error>;
}

impl<F> Builtin for F
where
    F: Fn(&mut Interpreter) -> Result<(), Error>,
{
    fn invoke(&self, interp: &mut Interpreter) -> Result<(), Error> {
        self(interp)
    }
}

/// What a command does when invoked
#[derive(Clone)]
pub enum CommandKind {
    Native(Rc<dyn Builtin>),
    Program(Rc<Program>),
}

impl fmt::Debug for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Native(_) => write!(f, "Native(<fn>)"),
            CommandKind::Program(program) => write!(f, "Program({program:?})"),
        }
    }
}

/// A named, invocable entry
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    kind: CommandKind,
    category: String,
    help: String,
}

impl Command {
    pub fn native(
        name: impl Into<String>,
        category: impl Into<String>,
        help: impl Into<String>,
        behavior: impl Builtin + 'static,
    ) -> Self {
        Command {
            name: name.into(),
            kind: CommandKind::Native(Rc::new(behavior)),
            category: category.into(),
            help: help.into(),
        }
    }

    pub fn program(name: impl Into<String>, program: Rc<Program>) -> Self {
        let help = format!("user program {}", Value::Program(program.clone()));
        Command {
            name: name.into(),
            kind: CommandKind::Program(program),
            category: USER_CATEGORY.to_owned(),
            help,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn help(&self) -> &str {
        &self.help
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    commands: HashMap<String, Rc<Command>>,
}

impl Registry {
    /// An empty registry; see [`crate::builtinops::create_global_registry`]
    /// for one holding the core word library
    pub fn new() -> Self {
        Registry {
            commands: HashMap::new(),
        }
    }

    /// Register a command, replacing any previous entry with the same name
    pub fn register(&mut self, command: Command) -> Result<Rc<Command>, Error> {
        let name = command.name();
        if !is_valid_word(name) || name.ends_with('?') || RESERVED_WORDS.contains(&name) {
            return Err(Error::failed(format!("`{name}` cannot be used as a command name")));
        }
        let command = Rc::new(command);
        tracing::debug!(name = command.name(), category = command.category(), "registered command");
        self.commands
            .insert(command.name().to_owned(), command.clone());
        Ok(command)
    }

    pub fn register_native(
        &mut self,
        name: &str,
        category: &str,
        help: &str,
        behavior: impl Builtin + 'static,
    ) -> Result<Rc<Command>, Error> {
        self.register(Command::native(name, category, help, behavior))
    }

    pub fn register_program(
        &mut self,
        name: &str,
        program: Rc<Program>,
    ) -> Result<Rc<Command>, Error> {
        self.register(Command::program(name, program))
    }

    pub fn unregister(&mut self, name: &str) -> Option<Rc<Command>> {
        let removed = self.commands.remove(name);
        if removed.is_some() {
            tracing::debug!(name, "unregistered command");
        }
        removed
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Command>> {
        self.commands.get(name).cloned()
    }

    /// Command names grouped by category, each group sorted by name
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for command in self.commands.values() {
            groups
                .entry(command.category().to_owned())
                .or_default()
                .push(command.name().to_owned());
        }
        for names in groups.values_mut() {
            names.sort();
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::value::val;
    use pretty_assertions::assert_eq;

    fn nop(_: &mut Interpreter) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn test_register_lookup_unregister() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.register_native("NOP", "misc", "does nothing", nop).unwrap();

        let found = registry.lookup("NOP").unwrap();
        assert_eq!(found.name(), "NOP");
        assert_eq!(found.category(), "misc");
        assert_eq!(found.help(), "does nothing");
        assert!(matches!(found.kind(), CommandKind::Native(_)));
        assert!(registry.lookup("nop").is_none());

        assert!(registry.unregister("NOP").is_some());
        assert!(registry.unregister("NOP").is_none());
        assert!(registry.lookup("NOP").is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = Registry::new();
        registry.register_native("W", "a", "first", nop).unwrap();
        registry
            .register_program("W", Rc::new(Program::new(vec![val(1)], "ns", None)))
            .unwrap();

        let found = registry.lookup("W").unwrap();
        assert_eq!(found.category(), USER_CATEGORY);
        assert_eq!(found.help(), "user program << 1 >>");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut registry = Registry::new();
        let invalid = [
            "", "IF", "ENDWHILE", "None", "import", "ADD?", "12", "-3", "a b", "x[", "<<",
        ];
        for name in invalid {
            assert!(
                registry.register_native(name, "misc", "", nop).is_err(),
                "`{name}` should be rejected"
            );
        }
        assert!(registry.register_native("EXIT", "session", "", nop).is_ok());
        assert!(registry.register_native("-", "misc", "", nop).is_ok());
    }

    #[test]
    fn test_categories_grouped_and_sorted() {
        let mut registry = Registry::new();
        registry.register_native("SWAP", "stack", "", nop).unwrap();
        registry.register_native("DUP", "stack", "", nop).unwrap();
        registry.register_native("ADD", "arithmetic", "", nop).unwrap();

        let categories = registry.categories();
        assert_eq!(
            categories.into_iter().collect::<Vec<_>>(),
            vec![
                ("arithmetic".to_owned(), vec!["ADD".to_owned()]),
                ("stack".to_owned(), vec!["DUP".to_owned(), "SWAP".to_owned()]),
            ]
        );
    }
}
