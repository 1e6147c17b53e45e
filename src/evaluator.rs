//! Execution engine and interpreter state.
//!
//! [`Interpreter`] owns everything a running session mutates: the operand
//! stack, the namespace environment, the command registry, the interrupt
//! flag and the output sink. There are two entry points:
//!
//! - [`Interpreter::execute`] / [`Interpreter::execute_sequence`] walk values
//!   structurally. Literals push themselves, control nodes run their bodies
//!   and command references are dispatched.
//! - [`Interpreter::invoke`] runs a program's body inside a fresh local frame
//!   with the program's namespace current, restoring the caller's namespace
//!   and frame afterwards whether the body succeeded or not.

pub(crate) mod intooperation;

use crate::config::{Config, DisplayOptions, Limits};
use crate::environment::Environment;
use crate::reader::{FileLoader, ReadContext, Reader, SourceLoader};
use crate::registry::{Command, CommandKind, Registry};
use crate::stack::Stack;
use crate::value::{CommandRef, ForNode, IfNode, Program, Value, ValueKind, WhileNode};
use crate::Error;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag.
///
/// Cloning shares the flag, so a signal handler or another thread can hold
/// a copy and raise it while the engine runs. The engine polls it before
/// every sequence element and every loop iteration.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An in-memory output sink whose contents can be read back, for tests and
/// embedders that want to capture what the interpreter prints
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Rc<RefCell<Vec<u8>>>);

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Return the captured text and empty the buffer
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Interpreter {
    stack: Stack,
    env: Environment,
    registry: Registry,
    loader: Box<dyn SourceLoader>,
    interrupt: InterruptFlag,
    exit_requested: bool,
    call_depth: usize,
    limits: Limits,
    display: DisplayOptions,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Interpreter {
    /// An interpreter with the core word library, printing to stdout
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, crate::builtinops::create_global_registry())
    }

    pub fn with_registry(config: &Config, registry: Registry) -> Self {
        Interpreter {
            stack: Stack::new(),
            env: Environment::new(&config.session.namespace),
            registry,
            loader: Box::new(FileLoader::new(config.session.import_paths.clone())),
            interrupt: InterruptFlag::new(),
            exit_requested: false,
            call_depth: 0,
            limits: config.limits.clone(),
            display: config.display.clone(),
            out: Box::new(io::stdout()),
        }
    }

    /// Replace the output sink used by `PRINT`, `HELP` and error reports
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Share an existing interrupt flag, e.g. one raised by a signal handler
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    pub fn display(&self) -> &DisplayOptions {
        &self.display
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Stop the current execution and ask the driver to end the session
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Number of program invocations currently running
    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    fn should_stop(&self) -> bool {
        self.exit_requested || self.interrupt.is_raised()
    }

    /// Reader context for text read now: the live registry and the current
    /// namespace
    pub fn read_context(&self) -> ReadContext<'_> {
        ReadContext::new(&self.registry, self.env.current_namespace(), &*self.loader)
            .with_max_depth(self.limits.max_read_depth)
    }

    /// Read every value in `text` without executing any of it
    pub fn parse(&self, name: &str, text: &str) -> Result<Vec<Value>, Error> {
        Reader::new(name, text).read_all(&self.read_context())
    }

    /// Read and execute `text` one top-level unit at a time, stopping at the
    /// first error. Words registered by one unit are visible to the next.
    pub fn run_source(&mut self, name: &str, text: &str) -> Result<(), Error> {
        let mut reader = Reader::new(name, text);
        while !self.should_stop() {
            let Some(value) = reader.read_next(&self.read_context())? else {
                break;
            };
            self.execute(&value)?;
        }
        Ok(())
    }

    /// Structurally execute one value
    pub fn execute(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::Integer(_)
            | Value::String(_)
            | Value::None
            | Value::List(_)
            | Value::Map(_)
            | Value::Program(_) => self.stack.push(value.clone()),
            Value::If(node) => {
                let result = self.run_if(node);
                self.contain("IF", result);
                Ok(())
            }
            Value::For(node) => {
                let result = self.run_for(node);
                self.contain("FOR", result);
                Ok(())
            }
            Value::While(node) => {
                let result = self.run_while(node);
                self.contain("WHILE", result);
                Ok(())
            }
            Value::Command(command) => self.invoke_command(command),
        }
    }

    /// Structurally execute values in order, returning early when an
    /// interrupt or exit has been requested
    pub fn execute_sequence(&mut self, values: &[Value]) -> Result<(), Error> {
        for value in values {
            if self.should_stop() {
                tracing::debug!("sequence stopped by interrupt");
                return Ok(());
            }
            self.execute(value)?;
        }
        Ok(())
    }

    /// Invoke a program: fresh frame, program namespace, restore afterwards
    pub fn invoke(&mut self, program: &Rc<Program>) -> Result<(), Error> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(Error::failed(format!(
                "program invocations nested deeper than {}",
                self.limits.max_call_depth
            )));
        }
        tracing::trace!(
            depth = self.call_depth,
            namespace = program.namespace(),
            "invoking program"
        );

        let saved = self.env.switch_namespace(program.namespace());
        self.env.push_frame(program.clone());
        self.call_depth += 1;

        let result = self.execute_sequence(program.body());

        self.call_depth -= 1;
        self.env.pop_frame();
        self.env.switch_namespace(&saved);
        result
    }

    /// Dispatch a command reference: help queries print, natives run, user
    /// programs are invoked
    pub fn invoke_command(&mut self, command: &CommandRef) -> Result<(), Error> {
        if command.help {
            return self.print_help(&command.command);
        }
        match command.command.kind() {
            CommandKind::Native(behavior) => {
                tracing::trace!(name = command.name(), "native command");
                let behavior = behavior.clone();
                behavior.invoke(self)
            }
            CommandKind::Program(program) => {
                let program = program.clone();
                self.invoke(&program)
            }
        }
    }

    /// `CALL`: a variable holding a program is invoked, any other variable
    /// is executed structurally, and a name without a variable falls back
    /// to the registry
    pub fn call(&mut self, name: &str) -> Result<(), Error> {
        match self.env.recall(name) {
            Ok(Value::Program(program)) => self.invoke(&program),
            Ok(other) => self.execute(&other),
            Err(Error::NameNotFound(_)) => match self.registry.lookup(name) {
                Some(command) => self.invoke_command(&CommandRef::new(command)),
                None => Err(Error::NameNotFound(name.to_owned())),
            },
            Err(e) => Err(e),
        }
    }

    fn run_if(&mut self, node: &IfNode) -> Result<(), Error> {
        self.execute_sequence(&node.cond)?;
        if self.should_stop() {
            return Ok(());
        }
        if self.stack.pop()?.to_bool()? {
            self.execute_sequence(&node.then)
        } else {
            self.execute_sequence(&node.otherwise)
        }
    }

    fn run_for(&mut self, node: &ForNode) -> Result<(), Error> {
        let items: Vec<Value> = match self.stack.peek(0)? {
            Value::List(items) => items.borrow().clone(),
            Value::Map(entries) => entries
                .borrow()
                .iter()
                .map(|(key, value)| Value::list(vec![key.clone().into(), value.clone()]))
                .collect(),
            other => return Err(Error::type_mismatch("List or Map", other.kind())),
        };
        self.stack.pop()?;

        for item in items {
            if self.should_stop() {
                tracing::debug!("FOR stopped by interrupt");
                break;
            }
            self.stack.push(item)?;
            self.execute_sequence(&node.body)?;
        }
        Ok(())
    }

    fn run_while(&mut self, node: &WhileNode) -> Result<(), Error> {
        loop {
            if self.should_stop() {
                tracing::debug!("WHILE stopped by interrupt");
                return Ok(());
            }
            self.execute_sequence(&node.cond)?;
            if self.should_stop() || !self.stack.pop()?.to_bool()? {
                return Ok(());
            }
            self.execute_sequence(&node.body)?;
        }
    }

    /// Report an error raised inside a control form and carry on
    fn contain(&mut self, form: &str, result: Result<(), Error>) {
        if let Err(error) = result {
            tracing::warn!(form, %error, "error contained by control form");
            self.report(&error);
        }
    }

    /// Write `Error: <message>` to the output sink
    pub fn report(&mut self, error: &Error) {
        if let Err(e) = writeln!(self.out, "Error: {error}") {
            tracing::error!(%e, "cannot write error report");
        }
    }

    /// Write a line to the output sink
    pub fn print(&mut self, text: &str) -> Result<(), Error> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    pub fn print_help(&mut self, command: &Command) -> Result<(), Error> {
        let text = format!("{} ({}): {}", command.name(), command.category(), command.help());
        self.print(&text)
    }

    /// Render a value with the configured display limits
    pub fn render(&self, value: &Value) -> String {
        value.display_with(&self.display).to_string()
    }

    /// Peek the top value and fail unless it has the given variant
    pub(crate) fn expect_top(&self, n: usize, kind: ValueKind) -> Result<&Value, Error> {
        let value = self.stack.peek(n)?;
        if value.kind() == kind {
            Ok(value)
        } else {
            Err(Error::type_mismatch(kind.to_string(), value.kind()))
        }
    }
}
