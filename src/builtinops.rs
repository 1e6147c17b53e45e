//! The core word library.
//!
//! Every word follows the stack calling convention: operands are read from
//! the top of the stack (the last parameter is the top), validated, and only
//! then consumed. Pure words are written as typed functions and wired through
//! the adapters in `evaluator::intooperation`; words that need the
//! interpreter (variables, invocation, I/O) take `&mut Interpreter` directly
//! and peek before they pop.

use crate::Error;
use crate::evaluator::Interpreter;
use crate::evaluator::intooperation::{IntoWord, WordFn};
use crate::registry::Registry;
use crate::value::{IntegerType, ListRef, MapKey, MapRef, Program, Value, ValueKind};
use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

pub const STACK: &str = "stack";
pub const ARITHMETIC: &str = "arithmetic";
pub const COMPARISON: &str = "comparison";
pub const LOGIC: &str = "logic";
pub const COLLECTIONS: &str = "collections";
pub const STRINGS: &str = "strings";
pub const VARIABLES: &str = "variables";
pub const PROGRAMS: &str = "programs";
pub const IO: &str = "io";
pub const SESSION: &str = "session";

/// Largest list `RANGE` will build
const MAX_RANGE_LEN: IntegerType = 1 << 20;

/// Definition of a built-in word
pub struct CoreWord {
    pub name: &'static str,
    pub category: &'static str,
    /// Stack effect and a short description
    pub help: &'static str,
    op: Arc<WordFn>,
}

impl std::fmt::Debug for CoreWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreWord")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

fn overflow() -> Error {
    Error::failed("integer overflow")
}

// =====================================================================
// stack
// =====================================================================

fn builtin_dup(v: Value) -> (Value, Value) {
    (v.clone(), v)
}

fn builtin_drop(_: Value) {}

fn builtin_swap(a: Value, b: Value) -> (Value, Value) {
    (b, a)
}

fn builtin_over(a: Value, b: Value) -> (Value, Value, Value) {
    (a.clone(), b, a)
}

fn builtin_rot(a: Value, b: Value, c: Value) -> (Value, Value, Value) {
    (b, c, a)
}

fn builtin_depth(interp: &mut Interpreter) -> Result<(), Error> {
    let depth = interp.stack().depth();
    let depth = IntegerType::try_from(depth).map_err(|_| overflow())?;
    interp.stack_mut().push_integer(depth);
    Ok(())
}

fn builtin_clear(interp: &mut Interpreter) -> Result<(), Error> {
    interp.stack_mut().clear();
    Ok(())
}

/// `n PICK` copies the value `n` positions below the index operand
fn builtin_pick(interp: &mut Interpreter) -> Result<(), Error> {
    let stack = interp.stack_mut();
    let n = match stack.peek(0)? {
        Value::Integer(n) => *n,
        other => return Err(Error::type_mismatch("Integer", other.kind())),
    };
    let n = usize::try_from(n).map_err(|_| Error::failed(format!("PICK index {n} is negative")))?;
    let picked = stack.peek(n + 1)?.clone();
    stack.pop()?;
    stack.push(picked)
}

// =====================================================================
// arithmetic
// =====================================================================

fn builtin_add(a: Value, b: Value) -> Result<Value, Error> {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => {
            a.checked_add(b).map(Value::Integer).ok_or_else(overflow)
        }
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (a @ (Value::Integer(_) | Value::String(_) | Value::List(_)), b) => {
            Err(Error::type_mismatch(a.kind().to_string(), b.kind()))
        }
        (a, _) => Err(Error::type_mismatch("Integer, String or List", a.kind())),
    }
}

fn builtin_sub(a: IntegerType, b: IntegerType) -> Result<IntegerType, Error> {
    a.checked_sub(b).ok_or_else(overflow)
}

fn builtin_mul(a: IntegerType, b: IntegerType) -> Result<IntegerType, Error> {
    a.checked_mul(b).ok_or_else(overflow)
}

fn builtin_div(a: IntegerType, b: IntegerType) -> Result<IntegerType, Error> {
    if b == 0 {
        return Err(Error::failed("division by zero"));
    }
    a.checked_div(b).ok_or_else(overflow)
}

fn builtin_mod(a: IntegerType, b: IntegerType) -> Result<IntegerType, Error> {
    if b == 0 {
        return Err(Error::failed("division by zero"));
    }
    a.checked_rem(b).ok_or_else(overflow)
}

fn builtin_neg(a: IntegerType) -> Result<IntegerType, Error> {
    a.checked_neg().ok_or_else(overflow)
}

// =====================================================================
// comparison and logic
// =====================================================================

fn builtin_eq(a: Value, b: Value) -> Result<bool, Error> {
    a.strict_eq(&b)
}

fn builtin_neq(a: Value, b: Value) -> Result<bool, Error> {
    a.strict_eq(&b).map(|eq| !eq)
}

/// Ordering for Integer/Integer and String/String pairs
fn compare(a: &Value, b: &Value) -> Result<Ordering, Error> {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Integer(_) | Value::String(_), b) => {
            Err(Error::type_mismatch(a.kind().to_string(), b.kind()))
        }
        (a, _) => Err(Error::type_mismatch("Integer or String", a.kind())),
    }
}

macro_rules! comparison_op {
    ($name:ident, $($ordering:ident)|+) => {
        fn $name(a: Value, b: Value) -> Result<bool, Error> {
            Ok(matches!(compare(&a, &b)?, $(Ordering::$ordering)|+))
        }
    };
}

comparison_op!(builtin_lt, Less);
comparison_op!(builtin_gt, Greater);
comparison_op!(builtin_le, Less | Equal);
comparison_op!(builtin_ge, Greater | Equal);

fn builtin_not(v: Value) -> Result<bool, Error> {
    Ok(!v.to_bool()?)
}

fn builtin_and(a: Value, b: Value) -> Result<bool, Error> {
    Ok(a.to_bool()? && b.to_bool()?)
}

fn builtin_or(a: Value, b: Value) -> Result<bool, Error> {
    Ok(a.to_bool()? || b.to_bool()?)
}

// =====================================================================
// collections
// =====================================================================

fn index_in(index: IntegerType, len: usize) -> Result<usize, Error> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| Error::failed(format!("index {index} out of range for length {len}")))
}

/// `x1 .. xn n LIST` packs the top `n` values into a list
fn builtin_list(interp: &mut Interpreter) -> Result<(), Error> {
    let stack = interp.stack_mut();
    let n = match stack.peek(0)? {
        Value::Integer(n) => *n,
        other => return Err(Error::type_mismatch("Integer", other.kind())),
    };
    let n = usize::try_from(n).map_err(|_| Error::failed(format!("LIST count {n} is negative")))?;
    stack.require(n + 1)?;
    stack.pop()?;
    let items = stack.pop_n(n)?;
    stack.push(Value::list(items))
}

fn builtin_size(v: Value) -> Result<IntegerType, Error> {
    let len = match &v {
        Value::List(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        Value::String(s) => s.chars().count(),
        other => return Err(Error::type_mismatch("List, Map or String", other.kind())),
    };
    IntegerType::try_from(len).map_err(|_| overflow())
}

fn builtin_get(collection: Value, key: Value) -> Result<Value, Error> {
    match (&collection, key) {
        (Value::List(items), Value::Integer(index)) => {
            let items = items.borrow();
            Ok(items[index_in(index, items.len())?].clone())
        }
        (Value::List(_), key) => Err(Error::type_mismatch("Integer index", key.kind())),
        (Value::Map(entries), key) => {
            let key = MapKey::try_from(key)?;
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::failed(format!("key {} not in map", Value::from(key))))
        }
        (other, _) => Err(Error::type_mismatch("List or Map", other.kind())),
    }
}

/// `coll key value PUT` updates the collection in place and pushes it back
fn builtin_put(collection: Value, key: Value, value: Value) -> Result<Value, Error> {
    match (&collection, key) {
        (Value::List(items), Value::Integer(index)) => {
            let mut items = items.borrow_mut();
            let index = index_in(index, items.len())?;
            items[index] = value;
        }
        (Value::List(_), key) => return Err(Error::type_mismatch("Integer index", key.kind())),
        (Value::Map(entries), key) => {
            let key = MapKey::try_from(key)?;
            entries.borrow_mut().insert(key, value);
        }
        (other, _) => return Err(Error::type_mismatch("List or Map", other.kind())),
    }
    Ok(collection)
}

fn builtin_append(list: ListRef, item: Value) -> ListRef {
    list.borrow_mut().push(item);
    list
}

fn builtin_insert(list: ListRef, index: IntegerType, item: Value) -> Result<ListRef, Error> {
    {
        let mut items = list.borrow_mut();
        let len = items.len();
        let at = usize::try_from(index)
            .ok()
            .filter(|&i| i <= len)
            .ok_or_else(|| {
                Error::failed(format!("insert position {index} out of range for length {len}"))
            })?;
        items.insert(at, item);
    }
    Ok(list)
}

fn builtin_keys(map: MapRef) -> Value {
    Value::list(map.borrow().keys().cloned().map(Value::from).collect())
}

fn builtin_range(start: IntegerType, end: IntegerType) -> Result<Value, Error> {
    if end.saturating_sub(start) > MAX_RANGE_LEN {
        return Err(Error::failed(format!("RANGE longer than {MAX_RANGE_LEN} items")));
    }
    Ok(Value::list((start..end).map(Value::Integer).collect()))
}

fn builtin_clone(v: Value) -> Result<Value, Error> {
    v.shallow_copy()
}

fn builtin_tostr(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

// =====================================================================
// variables
// =====================================================================

/// Peek a String operand `n` positions below the top
fn peek_name(interp: &Interpreter, n: usize) -> Result<String, Error> {
    match interp.expect_top(n, ValueKind::String)? {
        Value::String(name) => Ok(name.clone()),
        other => Err(Error::type_mismatch("String", other.kind())),
    }
}

/// `value "name" STO`
fn builtin_sto(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    interp.stack().require(2)?;
    interp.stack_mut().pop()?;
    let value = interp.stack_mut().pop()?;
    interp.env_mut().store(&name, value);
    Ok(())
}

fn builtin_rcl(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    let value = interp.env().recall(&name)?;
    interp.stack_mut().pop()?;
    interp.stack_mut().push(value)
}

fn builtin_purge(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    interp.env_mut().purge(&name)?;
    interp.stack_mut().pop()?;
    Ok(())
}

/// `value "name" LSTO`
fn builtin_lsto(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    let value = interp.stack().peek(1)?.clone();
    interp.env_mut().set_local(&name, value)?;
    interp.stack_mut().pop_n(2)?;
    Ok(())
}

fn builtin_lrcl(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    let value = interp.env().get_local(&name)?;
    interp.stack_mut().pop()?;
    interp.stack_mut().push(value)
}

fn builtin_setns(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    if name.is_empty() {
        return Err(Error::failed("namespace name cannot be empty"));
    }
    interp.stack_mut().pop()?;
    interp.env_mut().switch_namespace(&name);
    Ok(())
}

fn builtin_ns(interp: &mut Interpreter) -> Result<(), Error> {
    let name = interp.env().current_namespace().to_owned();
    interp.stack_mut().push_string(name);
    Ok(())
}

/// Pushes the sorted variable names of the current namespace
fn builtin_vars(interp: &mut Interpreter) -> Result<(), Error> {
    let env = interp.env();
    let names = env
        .module(env.current_namespace())
        .map(|module| module.names())
        .unwrap_or_default();
    let names = names.into_iter().map(Value::String).collect();
    interp.stack_mut().push(Value::list(names))
}

// =====================================================================
// programs
// =====================================================================

fn builtin_eval(interp: &mut Interpreter) -> Result<(), Error> {
    interp.expect_top(0, ValueKind::Program)?;
    let program = interp.stack_mut().pop_program()?;
    interp.invoke(&program)
}

fn builtin_call(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    if interp.env().recall(&name).is_err() && interp.registry().lookup(&name).is_none() {
        return Err(Error::NameNotFound(name));
    }
    interp.stack_mut().pop()?;
    interp.call(&name)
}

/// `program "NAME" REGISTER`
fn builtin_register(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    let program = match interp.expect_top(1, ValueKind::Program)? {
        Value::Program(program) => program.clone(),
        other => return Err(Error::type_mismatch("Program", other.kind())),
    };
    interp.registry_mut().register_program(&name, program)?;
    interp.stack_mut().pop_n(2)?;
    Ok(())
}

fn builtin_unregister(interp: &mut Interpreter) -> Result<(), Error> {
    let name = peek_name(interp, 0)?;
    if interp.registry_mut().unregister(&name).is_none() {
        return Err(Error::NameNotFound(name));
    }
    interp.stack_mut().pop()?;
    Ok(())
}

/// `<< try >> << catch >> TRYCATCH`: runs `try`; if it fails, pushes the
/// error message and runs `catch`
fn builtin_trycatch(interp: &mut Interpreter) -> Result<(), Error> {
    interp.expect_top(1, ValueKind::Program)?;
    interp.expect_top(0, ValueKind::Program)?;
    let catch = interp.stack_mut().pop_program()?;
    let attempt = interp.stack_mut().pop_program()?;
    match interp.invoke(&attempt) {
        Ok(()) => Ok(()),
        Err(error) => {
            tracing::debug!(%error, "TRYCATCH caught error");
            interp.stack_mut().push_string(error.to_string());
            interp.invoke(&catch)
        }
    }
}

// =====================================================================
// io and session
// =====================================================================

/// Prints strings raw and everything else rendered
fn builtin_print(interp: &mut Interpreter) -> Result<(), Error> {
    let text = match interp.stack().peek(0)? {
        Value::String(s) => s.clone(),
        other => interp.render(other),
    };
    interp.print(&text)?;
    interp.stack_mut().pop()?;
    Ok(())
}

fn builtin_help(interp: &mut Interpreter) -> Result<(), Error> {
    let categories = interp.registry().categories();
    for (category, names) in categories {
        interp.print(&format!("{category}: {}", names.join(" ")))?;
    }
    interp.print("Append ? to a word (e.g. ADD?) for its description.")
}

/// `"text" PARSE` reads text into a program without running it
fn builtin_parse(interp: &mut Interpreter) -> Result<(), Error> {
    let text = peek_name(interp, 0)?;
    let body = interp.parse("<PARSE>", &text)?;
    let namespace = interp.env().current_namespace().to_owned();
    interp.stack_mut().pop()?;
    interp
        .stack_mut()
        .push(Value::program(Program::new(body, namespace, None)))
}

/// `value "path" SAVE` writes the canonical rendering of a value
fn builtin_save(interp: &mut Interpreter) -> Result<(), Error> {
    let path = peek_name(interp, 0)?;
    let value = interp.stack().peek(1)?;
    if let Value::Command(_) = value {
        return Err(Error::type_mismatch("a data value", ValueKind::Command));
    }
    let text = format!("{value}\n");
    std::fs::write(&path, text).map_err(|e| Error::failed(format!("cannot write {path}: {e}")))?;
    tracing::debug!(path, "saved value");
    interp.stack_mut().pop_n(2)?;
    Ok(())
}

/// `"path" RESTORE` reads a file saved by SAVE and pushes its values
fn builtin_restore(interp: &mut Interpreter) -> Result<(), Error> {
    let path = peek_name(interp, 0)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Error::failed(format!("cannot read {path}: {e}")))?;
    let values = interp.parse(&path, &text)?;
    if let Some(command) = values.iter().find(|v| matches!(v, Value::Command(_))) {
        return Err(Error::type_mismatch(
            format!("data values in {path}"),
            command.kind(),
        ));
    }
    interp.stack_mut().pop()?;
    for value in values {
        interp.stack_mut().push(value)?;
    }
    Ok(())
}

fn builtin_exit(interp: &mut Interpreter) -> Result<(), Error> {
    interp.request_exit();
    Ok(())
}

fn builtin_interrupt(interp: &mut Interpreter) -> Result<(), Error> {
    interp.interrupt().raise();
    Ok(())
}

/// Global table of all built-in words.
///
/// Typed words are wired through the same adapter layer a host program
/// would use, once, at initialization time via a `LazyLock`.
static CORE_WORDS: LazyLock<Vec<CoreWord>> = LazyLock::new(|| {
    fn typed<Args, F>(f: F) -> Arc<WordFn>
    where
        F: IntoWord<Args>,
    {
        <F as IntoWord<Args>>::into_word(f)
    }

    fn native(f: fn(&mut Interpreter) -> Result<(), Error>) -> Arc<WordFn> {
        Arc::new(f)
    }

    fn word(
        name: &'static str,
        category: &'static str,
        help: &'static str,
        op: Arc<WordFn>,
    ) -> CoreWord {
        CoreWord {
            name,
            category,
            help,
            op,
        }
    }

    vec![
        // stack
        word(
            "DUP",
            STACK,
            "( a -- a a ) duplicate the top value",
            typed::<(Value,), _>(builtin_dup),
        ),
        word(
            "DROP",
            STACK,
            "( a -- ) discard the top value",
            typed::<(Value,), _>(builtin_drop),
        ),
        word(
            "SWAP",
            STACK,
            "( a b -- b a ) exchange the top two values",
            typed::<(Value, Value), _>(builtin_swap),
        ),
        word(
            "OVER",
            STACK,
            "( a b -- a b a ) copy the second value to the top",
            typed::<(Value, Value), _>(builtin_over),
        ),
        word(
            "ROT",
            STACK,
            "( a b c -- b c a ) rotate the third value to the top",
            typed::<(Value, Value, Value), _>(builtin_rot),
        ),
        word(
            "DEPTH",
            STACK,
            "( -- n ) number of values on the stack",
            native(builtin_depth),
        ),
        word(
            "CLEAR",
            STACK,
            "( ... -- ) remove every value",
            native(builtin_clear),
        ),
        word(
            "PICK",
            STACK,
            "( ... n -- ... x ) copy the value n below the index",
            native(builtin_pick),
        ),
        // arithmetic
        word(
            "ADD",
            ARITHMETIC,
            "( a b -- a+b ) add integers, concatenate strings or lists",
            typed::<(Value, Value), _>(builtin_add),
        ),
        word(
            "SUB",
            ARITHMETIC,
            "( a b -- a-b ) subtract integers",
            typed::<(IntegerType, IntegerType), _>(builtin_sub),
        ),
        word(
            "MUL",
            ARITHMETIC,
            "( a b -- a*b ) multiply integers",
            typed::<(IntegerType, IntegerType), _>(builtin_mul),
        ),
        word(
            "DIV",
            ARITHMETIC,
            "( a b -- a/b ) integer division, truncating",
            typed::<(IntegerType, IntegerType), _>(builtin_div),
        ),
        word(
            "MOD",
            ARITHMETIC,
            "( a b -- a%b ) remainder of integer division",
            typed::<(IntegerType, IntegerType), _>(builtin_mod),
        ),
        word(
            "NEG",
            ARITHMETIC,
            "( a -- -a ) negate an integer",
            typed::<(IntegerType,), _>(builtin_neg),
        ),
        // comparison
        word(
            "EQ",
            COMPARISON,
            "( a b -- flag ) equality of two values of the same type",
            typed::<(Value, Value), _>(builtin_eq),
        ),
        word(
            "NEQ",
            COMPARISON,
            "( a b -- flag ) inequality of two values of the same type",
            typed::<(Value, Value), _>(builtin_neq),
        ),
        word(
            "LT",
            COMPARISON,
            "( a b -- flag ) a < b for integers or strings",
            typed::<(Value, Value), _>(builtin_lt),
        ),
        word(
            "GT",
            COMPARISON,
            "( a b -- flag ) a > b for integers or strings",
            typed::<(Value, Value), _>(builtin_gt),
        ),
        word(
            "LE",
            COMPARISON,
            "( a b -- flag ) a <= b for integers or strings",
            typed::<(Value, Value), _>(builtin_le),
        ),
        word(
            "GE",
            COMPARISON,
            "( a b -- flag ) a >= b for integers or strings",
            typed::<(Value, Value), _>(builtin_ge),
        ),
        // logic
        word(
            "NOT",
            LOGIC,
            "( a -- flag ) logical negation",
            typed::<(Value,), _>(builtin_not),
        ),
        word(
            "AND",
            LOGIC,
            "( a b -- flag ) logical and",
            typed::<(Value, Value), _>(builtin_and),
        ),
        word(
            "OR",
            LOGIC,
            "( a b -- flag ) logical or",
            typed::<(Value, Value), _>(builtin_or),
        ),
        // collections
        word(
            "LIST",
            COLLECTIONS,
            "( x1 .. xn n -- list ) pack n values into a list",
            native(builtin_list),
        ),
        word(
            "SIZE",
            COLLECTIONS,
            "( coll -- n ) length of a list, map or string",
            typed::<(Value,), _>(builtin_size),
        ),
        word(
            "GET",
            COLLECTIONS,
            "( coll key -- value ) list element or map entry",
            typed::<(Value, Value), _>(builtin_get),
        ),
        word(
            "PUT",
            COLLECTIONS,
            "( coll key value -- coll ) store into a list or map in place",
            typed::<(Value, Value, Value), _>(builtin_put),
        ),
        word(
            "APPEND",
            COLLECTIONS,
            "( list x -- list ) append in place",
            typed::<(ListRef, Value), _>(builtin_append),
        ),
        word(
            "INSERT",
            COLLECTIONS,
            "( list i x -- list ) insert before position i in place",
            typed::<(ListRef, IntegerType, Value), _>(builtin_insert),
        ),
        word(
            "KEYS",
            COLLECTIONS,
            "( map -- list ) keys in iteration order",
            typed::<(MapRef,), _>(builtin_keys),
        ),
        word(
            "RANGE",
            COLLECTIONS,
            "( start end -- list ) integers from start up to end",
            typed::<(IntegerType, IntegerType), _>(builtin_range),
        ),
        word(
            "CLONE",
            COLLECTIONS,
            "( a -- copy ) one-level-deep copy",
            typed::<(Value,), _>(builtin_clone),
        ),
        // strings
        word(
            "TOSTR",
            STRINGS,
            "( a -- string ) canonical text of a value",
            typed::<(Value,), _>(builtin_tostr),
        ),
        // variables
        word(
            "STO",
            VARIABLES,
            "( value name -- ) store a variable",
            native(builtin_sto),
        ),
        word(
            "RCL",
            VARIABLES,
            "( name -- value ) recall a variable",
            native(builtin_rcl),
        ),
        word(
            "PURGE",
            VARIABLES,
            "( name -- ) delete a variable",
            native(builtin_purge),
        ),
        word(
            "LSTO",
            VARIABLES,
            "( value name -- ) store a local of the running program",
            native(builtin_lsto),
        ),
        word(
            "LRCL",
            VARIABLES,
            "( name -- value ) recall a local of the running program",
            native(builtin_lrcl),
        ),
        word(
            "SETNS",
            VARIABLES,
            "( name -- ) make a namespace current",
            native(builtin_setns),
        ),
        word(
            "NS",
            VARIABLES,
            "( -- name ) the current namespace",
            native(builtin_ns),
        ),
        word(
            "VARS",
            VARIABLES,
            "( -- list ) variable names of the current namespace",
            native(builtin_vars),
        ),
        // programs
        word(
            "EVAL",
            PROGRAMS,
            "( program -- ... ) invoke a program",
            native(builtin_eval),
        ),
        word(
            "CALL",
            PROGRAMS,
            "( name -- ... ) invoke a variable or command by name",
            native(builtin_call),
        ),
        word(
            "REGISTER",
            PROGRAMS,
            "( program name -- ) define a new word",
            native(builtin_register),
        ),
        word(
            "UNREGISTER",
            PROGRAMS,
            "( name -- ) remove a word",
            native(builtin_unregister),
        ),
        word(
            "TRYCATCH",
            PROGRAMS,
            "( try catch -- ... ) run try; on error push the message and run catch",
            native(builtin_trycatch),
        ),
        // io
        word(
            "PRINT",
            IO,
            "( a -- ) print a value",
            native(builtin_print),
        ),
        word(
            "HELP",
            IO,
            "( -- ) list words by category",
            native(builtin_help),
        ),
        word(
            "PARSE",
            IO,
            "( text -- program ) read text into a program",
            native(builtin_parse),
        ),
        word(
            "SAVE",
            IO,
            "( value path -- ) write a value to a file",
            native(builtin_save),
        ),
        word(
            "RESTORE",
            IO,
            "( path -- values ) read values saved with SAVE",
            native(builtin_restore),
        ),
        // session
        word(
            "EXIT",
            SESSION,
            "( -- ) end the session",
            native(builtin_exit),
        ),
        word(
            "INTERRUPT",
            SESSION,
            "( -- ) stop the running input as Ctrl-C does",
            native(builtin_interrupt),
        ),
    ]
});

pub fn core_words() -> &'static [CoreWord] {
    &CORE_WORDS
}

pub fn find_core_word(name: &str) -> Option<&'static CoreWord> {
    CORE_WORDS.iter().find(|word| word.name == name)
}

/// A registry holding the whole core word library
pub fn create_global_registry() -> Registry {
    let mut registry = Registry::new();
    for word in core_words() {
        let op = Arc::clone(&word.op);
        let registered = registry.register_native(
            word.name,
            word.category,
            word.help,
            move |interp: &mut Interpreter| op(interp),
        );
        if let Err(error) = registered {
            tracing::error!(name = word.name, %error, "cannot register core word");
        }
    }
    registry
}
