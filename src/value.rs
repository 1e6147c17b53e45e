//! Runtime values of the language.
//!
//! The main enum, [`Value`], is a closed set of variants: integers, strings,
//! the `None` literal, lists, maps, programs (deferred bodies), command
//! references and the three control nodes produced by the reader. Composite
//! variants (`List`, `Map`) are shared by reference, so duplicating them on the
//! stack aliases the same storage; [`Value::shallow_copy`] is the only way to
//! break that aliasing.
//!
//! Rendering through [`std::fmt::Display`] is canonical: it produces exactly the
//! syntax the reader accepts, so any value built from round-trippable parts can
//! be saved as text and read back. [`Value::display_with`] renders with element
//! limits and elides the rest with `...`.

use crate::Error;
use crate::config::DisplayOptions;
use crate::registry::Command;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Type alias for integer values in the interpreter
pub type IntegerType = i64;

/// Shared, mutable list storage
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable map storage; keys are kept in sorted order, which is the
/// iteration order `FOR` and rendering use.
pub type MapRef = Rc<RefCell<BTreeMap<MapKey, Value>>>;

/// Nesting past this depth renders as `...`, which keeps self-containing
/// composites from recursing without bound.
const MAX_RENDER_DEPTH: usize = 64;

/// Composites nested deeper than this cannot be compared
const MAX_COMPARE_DEPTH: usize = 64;

/// The variant tag of a [`Value`], used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    String,
    None,
    List,
    Map,
    Program,
    Command,
    If,
    For,
    While,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "Integer",
            ValueKind::String => "String",
            ValueKind::None => "None",
            ValueKind::List => "List",
            ValueKind::Map => "Map",
            ValueKind::Program => "Program",
            ValueKind::Command => "Command",
            ValueKind::If => "If",
            ValueKind::For => "For",
            ValueKind::While => "While",
        };
        f.write_str(name)
    }
}

/// Map keys: only integers and strings can be hashed, compared and ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Integer(IntegerType),
    String(String),
}

impl TryFrom<Value> for MapKey {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::Integer(n) => Ok(MapKey::Integer(n)),
            Value::String(s) => Ok(MapKey::String(s)),
            other => Err(Error::type_mismatch("Integer or String map key", other.kind())),
        }
    }
}

impl MapKey {
    /// Check whether a value could be used as a key, without consuming it
    pub fn accepts(value: &Value) -> bool {
        matches!(value, Value::Integer(_) | Value::String(_))
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Integer(n) => Value::Integer(n),
            MapKey::String(s) => Value::String(s),
        }
    }
}

/// A deferred, invocable body of values.
///
/// A program remembers the namespace it was read in and, when it was read
/// inside another program, a weak link to that lexically enclosing program.
/// Local frames are not stored here: every invocation gets its own frame in
/// the [`crate::environment::Environment`].
pub struct Program {
    body: Vec<Value>,
    namespace: String,
    enclosing: Option<Weak<Program>>,
}

impl Program {
    pub fn new(
        body: Vec<Value>,
        namespace: impl Into<String>,
        enclosing: Option<Weak<Program>>,
    ) -> Self {
        Program {
            body,
            namespace: namespace.into(),
            enclosing,
        }
    }

    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// The namespace the program was read in; invocation switches to it
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The program this one was lexically nested in, if it is still alive
    pub fn enclosing(&self) -> Option<Rc<Program>> {
        self.enclosing.as_ref().and_then(Weak::upgrade)
    }

    /// Number of lexically enclosing programs
    pub fn nesting_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.enclosing();
        while let Some(program) = current {
            depth += 1;
            current = program.enclosing();
        }
        depth
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Program(ns={}, body={:?})", self.namespace, self.body)
    }
}

/// `IF cond THEN then ELSE otherwise ENDIF`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IfNode {
    pub cond: Vec<Value>,
    pub then: Vec<Value>,
    pub otherwise: Vec<Value>,
}

/// `FOR body ENDFOR`; the collection comes from the stack at run time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForNode {
    pub body: Vec<Value>,
}

/// `WHILE cond REPEAT body ENDWHILE`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhileNode {
    pub cond: Vec<Value>,
    pub body: Vec<Value>,
}

/// A resolved reference to a registered command.
///
/// `help` is set when the word was written with the help-request marker
/// (`ADD?`); executing such a reference prints help instead of running.
#[derive(Clone)]
pub struct CommandRef {
    pub command: Rc<Command>,
    pub help: bool,
}

impl CommandRef {
    pub fn new(command: Rc<Command>) -> Self {
        CommandRef {
            command,
            help: false,
        }
    }

    pub fn help_query(command: Rc<Command>) -> Self {
        CommandRef { command, help: true }
    }

    pub fn name(&self) -> &str {
        self.command.name()
    }
}

/// Core value type of the interpreter
#[derive(Clone)]
pub enum Value {
    Integer(IntegerType),
    String(String),
    /// The absence value
    None,
    List(ListRef),
    Map(MapRef),
    Program(Rc<Program>),
    /// Invocable entity; never pushed onto the operand stack as data
    Command(CommandRef),
    If(Rc<IfNode>),
    For(Rc<ForNode>),
    While(Rc<WhileNode>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::None => ValueKind::None,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Program(_) => ValueKind::Program,
            Value::Command(_) => ValueKind::Command,
            Value::If(_) => ValueKind::If,
            Value::For(_) => ValueKind::For,
            Value::While(_) => ValueKind::While,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<MapKey, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn empty_map() -> Self {
        Value::map(BTreeMap::new())
    }

    pub fn program(program: Program) -> Self {
        Value::Program(Rc::new(program))
    }

    /// Truthiness used by `IF`, `WHILE` and the logic words.
    ///
    /// Non-zero integers and non-empty strings, lists and maps are true;
    /// `None`, programs and control nodes are false; a command cannot be
    /// coerced.
    pub fn to_bool(&self) -> Result<bool, Error> {
        match self {
            Value::Integer(n) => Ok(*n != 0),
            Value::String(s) => Ok(!s.is_empty()),
            Value::List(items) => Ok(!items.borrow().is_empty()),
            Value::Map(entries) => Ok(!entries.borrow().is_empty()),
            Value::None
            | Value::Program(_)
            | Value::If(_)
            | Value::For(_)
            | Value::While(_) => Ok(false),
            Value::Command(_) => Err(Error::type_mismatch(
                "a value with a truth value",
                ValueKind::Command,
            )),
        }
    }

    /// Produce a new, independently owned top-level object.
    ///
    /// The copy is one level deep: a cloned list or map gets its own storage,
    /// but composite elements inside it are still shared with the original.
    /// A cloned program gets its own body vector with the same namespace and
    /// enclosing link. Commands cannot be cloned.
    pub fn shallow_copy(&self) -> Result<Value, Error> {
        match self {
            Value::List(items) => Ok(Value::list(items.borrow().clone())),
            Value::Map(entries) => Ok(Value::map(entries.borrow().clone())),
            Value::Program(program) => Ok(Value::program(Program::new(
                program.body.clone(),
                program.namespace.clone(),
                program.enclosing.clone(),
            ))),
            Value::Command(_) => Err(Error::type_mismatch(
                "a clonable value",
                ValueKind::Command,
            )),
            Value::Integer(_)
            | Value::String(_)
            | Value::None
            | Value::If(_)
            | Value::For(_)
            | Value::While(_) => Ok(self.clone()),
        }
    }

    /// Equality for the `EQ`/`NEQ` words: both operands must share a variant.
    pub fn strict_eq(&self, other: &Value) -> Result<bool, Error> {
        if self.kind() == other.kind() {
            self.eq_at(other, 0).ok_or_else(|| {
                Error::failed(format!(
                    "cannot compare values nested deeper than {MAX_COMPARE_DEPTH} levels"
                ))
            })
        } else {
            Err(Error::type_mismatch(self.kind().to_string(), other.kind()))
        }
    }

    /// Render with the given element limits
    pub fn display_with<'a>(&'a self, options: &'a DisplayOptions) -> Rendered<'a> {
        Rendered {
            value: self,
            options,
        }
    }
}

impl Value {
    /// Structural equality with a nesting bound; `None` once the bound is
    /// passed, which only self-containing or absurdly deep composites reach.
    fn eq_at(&self, other: &Value, depth: usize) -> Option<bool> {
        if depth >= MAX_COMPARE_DEPTH {
            return None;
        }
        let equal = match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Some(true);
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Some(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.eq_at(y, depth + 1)? {
                        return Some(false);
                    }
                }
                true
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Some(true);
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Some(false);
                }
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    if ka != kb || !va.eq_at(vb, depth + 1)? {
                        return Some(false);
                    }
                }
                true
            }
            (Value::Program(a), Value::Program(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Command(a), Value::Command(b)) => a.name() == b.name() && a.help == b.help,
            (Value::If(a), Value::If(b)) => a == b,
            (Value::For(a), Value::For(b)) => a == b,
            (Value::While(a), Value::While(b)) => a == b,
            _ => false, // Different variants are never equal
        };
        Some(equal)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_at(other, 0).unwrap_or(false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::None => write!(f, "None"),
            Value::List(items) => write!(f, "List({:?})", items.borrow()),
            Value::Map(entries) => write!(f, "Map({:?})", entries.borrow()),
            Value::Program(program) => write!(f, "{program:?}"),
            Value::Command(c) if c.help => write!(f, "Command({}?)", c.name()),
            Value::Command(c) => write!(f, "Command({})", c.name()),
            Value::If(node) => write!(f, "{node:?}"),
            Value::For(node) => write!(f, "{node:?}"),
            Value::While(node) => write!(f, "{node:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self, f, &DisplayOptions::unlimited(), 0)
    }
}

/// A value paired with display limits; see [`Value::display_with`]
pub struct Rendered<'a> {
    value: &'a Value,
    options: &'a DisplayOptions,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self.value, f, self.options, 0)
    }
}

fn render(
    value: &Value,
    f: &mut fmt::Formatter<'_>,
    options: &DisplayOptions,
    depth: usize,
) -> fmt::Result {
    if depth >= MAX_RENDER_DEPTH {
        return f.write_str("...");
    }
    match value {
        Value::Integer(n) => write!(f, "{n}"),
        Value::String(s) => render_string(s, f),
        Value::None => f.write_str("None"),
        Value::List(items) => {
            f.write_str("[")?;
            render_sequence(&items.borrow(), f, options, depth, options.max_list_items)?;
            f.write_str(" ]")
        }
        Value::Map(entries) => {
            f.write_str("{")?;
            let entries = entries.borrow();
            for (i, (key, value)) in entries.iter().enumerate() {
                if options.max_list_items.is_some_and(|max| i >= max) {
                    f.write_str(" ...")?;
                    break;
                }
                f.write_str(" ")?;
                match key {
                    MapKey::Integer(n) => write!(f, "{n}")?,
                    MapKey::String(s) => render_string(s, f)?,
                }
                f.write_str(" ")?;
                render(value, f, options, depth + 1)?;
            }
            f.write_str(" }")
        }
        Value::Program(program) => {
            f.write_str("<<")?;
            render_sequence(&program.body, f, options, depth, options.max_program_items)?;
            f.write_str(" >>")
        }
        Value::Command(c) => {
            f.write_str(c.name())?;
            if c.help {
                f.write_str("?")?;
            }
            Ok(())
        }
        Value::If(node) => {
            f.write_str("IF")?;
            render_sequence(&node.cond, f, options, depth, None)?;
            f.write_str(" THEN")?;
            render_sequence(&node.then, f, options, depth, None)?;
            if !node.otherwise.is_empty() {
                f.write_str(" ELSE")?;
                render_sequence(&node.otherwise, f, options, depth, None)?;
            }
            f.write_str(" ENDIF")
        }
        Value::For(node) => {
            f.write_str("FOR")?;
            render_sequence(&node.body, f, options, depth, None)?;
            f.write_str(" ENDFOR")
        }
        Value::While(node) => {
            f.write_str("WHILE")?;
            render_sequence(&node.cond, f, options, depth, None)?;
            f.write_str(" REPEAT")?;
            render_sequence(&node.body, f, options, depth, None)?;
            f.write_str(" ENDWHILE")
        }
    }
}

/// Writes each item preceded by a space, eliding after `limit` items
fn render_sequence(
    items: &[Value],
    f: &mut fmt::Formatter<'_>,
    options: &DisplayOptions,
    depth: usize,
    limit: Option<usize>,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if limit.is_some_and(|max| i >= max) {
            return f.write_str(" ...");
        }
        f.write_str(" ")?;
        render(item, f, options, depth + 1)?;
    }
    Ok(())
}

fn render_string(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("\"")?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl From<IntegerType> for Value {
    fn from(n: IntegerType) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(IntegerType::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating Values in tests
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn program(body: Vec<Value>) -> Value {
        Value::program(Program::new(body, "test", None))
    }

    fn map_of(entries: Vec<(MapKey, Value)>) -> Value {
        Value::map(entries.into_iter().collect())
    }

    #[test]
    fn test_to_bool_data_driven() {
        let test_cases = vec![
            (val(0), false),
            (val(7), true),
            (val(-1), true),
            (val(""), false),
            (val("x"), true),
            (Value::list(vec![]), false),
            (val(vec![0]), true),
            (Value::empty_map(), false),
            (map_of(vec![(MapKey::Integer(1), val(0))]), true),
            (Value::None, false),
            (program(vec![val(1)]), false),
            (Value::If(Rc::new(IfNode::default())), false),
        ];

        for (i, (value, expected)) in test_cases.iter().enumerate() {
            assert_eq!(value.to_bool().unwrap(), *expected, "case #{} ({value})", i + 1);
        }
    }

    #[test]
    fn test_canonical_rendering() {
        let nested = program(vec![
            val(1),
            program(vec![val("inner")]),
            Value::If(Rc::new(IfNode {
                cond: vec![val(1)],
                then: vec![val("yes")],
                otherwise: vec![],
            })),
        ]);
        let test_cases = vec![
            (val(42), "42"),
            (val(-3), "-3"),
            (val("hi"), "\"hi\""),
            (val("a\"b\\c\nd\te"), "\"a\\\"b\\\\c\\nd\\te\""),
            (Value::None, "None"),
            (Value::list(vec![]), "[ ]"),
            (val(vec![val(1), val("two"), val(vec![3])]), "[ 1 \"two\" [ 3 ] ]"),
            (
                map_of(vec![
                    (MapKey::String("b".into()), val(2)),
                    (MapKey::Integer(1), val("one")),
                ]),
                "{ 1 \"one\" \"b\" 2 }",
            ),
            (program(vec![]), "<< >>"),
            (nested, "<< 1 << \"inner\" >> IF 1 THEN \"yes\" ENDIF >>"),
            (
                Value::For(Rc::new(ForNode {
                    body: vec![val(1)],
                })),
                "FOR 1 ENDFOR",
            ),
            (
                Value::While(Rc::new(WhileNode {
                    cond: vec![val(0)],
                    body: vec![],
                })),
                "WHILE 0 REPEAT ENDWHILE",
            ),
        ];

        for (value, expected) in test_cases {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn test_rendering_elides_past_limits() {
        let options = DisplayOptions {
            max_list_items: Some(2),
            max_program_items: Some(1),
        };
        let list = val(vec![1, 2, 3, 4]);
        assert_eq!(list.display_with(&options).to_string(), "[ 1 2 ... ]");

        let prog = program(vec![val(1), val(2)]);
        assert_eq!(prog.display_with(&options).to_string(), "<< 1 ... >>");

        let short = val(vec![1, 2]);
        assert_eq!(short.display_with(&options).to_string(), "[ 1 2 ]");
    }

    #[test]
    fn test_self_containing_list_renders_finitely() {
        let list = Value::list(vec![]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        let rendered = list.to_string();
        assert!(rendered.contains("..."));
    }

    #[test]
    fn test_self_containing_lists_compare_finitely() {
        fn self_containing() -> Value {
            let list = Value::list(vec![]);
            if let Value::List(items) = &list {
                items.borrow_mut().push(list.clone());
            }
            list
        }
        let (a, b) = (self_containing(), self_containing());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        let err = a.strict_eq(&b).unwrap_err();
        assert!(matches!(err, Error::OperationFailed(_)), "{err:?}");
        assert!(a.strict_eq(&a.clone()).unwrap());
    }

    #[test]
    fn test_equality_across_variants_is_false() {
        assert_ne!(val(1), val("1"));
        assert_ne!(Value::None, val(0));
        assert_ne!(val(vec![1]), program(vec![val(1)]));
        assert_eq!(val(vec![1, 2]), val(vec![1, 2]));
        assert_eq!(program(vec![val(1)]), program(vec![val(1)]));
    }

    #[test]
    fn test_strict_eq_requires_same_variant() {
        assert!(val(3).strict_eq(&val(3)).unwrap());
        assert!(!val("a").strict_eq(&val("b")).unwrap());
        let err = val(3).strict_eq(&val("3")).unwrap_err();
        assert_eq!(err, Error::type_mismatch("Integer", ValueKind::String));
    }

    #[test]
    fn test_shared_list_until_shallow_copy() {
        let original = val(vec![1]);
        let alias = original.clone();
        let copy = original.shallow_copy().unwrap();

        if let Value::List(items) = &alias {
            items.borrow_mut().push(val(2));
        }

        assert_eq!(original, val(vec![1, 2]));
        assert_eq!(copy, val(vec![1]));
    }

    #[test]
    fn test_shallow_copy_is_one_level_deep() {
        let inner = val(vec![1]);
        let outer = Value::list(vec![inner.clone()]);
        let copy = outer.shallow_copy().unwrap();

        if let Value::List(items) = &inner {
            items.borrow_mut().push(val(2));
        }

        // The nested list is still shared with the original
        assert_eq!(copy, Value::list(vec![val(vec![1, 2])]));
    }

    #[test]
    fn test_map_keys_restricted() {
        assert_eq!(MapKey::try_from(val(5)).unwrap(), MapKey::Integer(5));
        assert_eq!(
            MapKey::try_from(val("k")).unwrap(),
            MapKey::String("k".into())
        );
        let err = MapKey::try_from(val(vec![1])).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                actual: ValueKind::List,
                ..
            }
        ));
        assert!(!MapKey::accepts(&Value::None));
    }

    #[test]
    fn test_program_enclosing_link() {
        let outer = Rc::new_cyclic(|me: &Weak<Program>| {
            let inner = Program::new(vec![val(1)], "test", Some(me.clone()));
            Program::new(vec![Value::program(inner)], "test", None)
        });

        let Value::Program(inner) = &outer.body()[0] else {
            panic!("expected nested program");
        };
        let enclosing = inner.enclosing().unwrap();
        assert!(Rc::ptr_eq(&enclosing, &outer));
        assert_eq!(inner.nesting_depth(), 1);
        assert_eq!(outer.nesting_depth(), 0);
    }
}
