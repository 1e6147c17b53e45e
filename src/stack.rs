//! The operand stack.
//!
//! One stack is shared by the whole interpreter, not one per program. Every
//! typed accessor checks the depth and the variant before it removes anything,
//! so a failed pop never partially consumes the stack.

use crate::Error;
use crate::value::{IntegerType, ListRef, MapRef, Program, Value, ValueKind};
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
}

macro_rules! typed_pop {
    ($name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        #[doc = concat!("Pop the top value, which must be ", $expected)]
        pub fn $name(&mut self) -> Result<$ty, Error> {
            match self.values.pop() {
                Some(Value::$variant(inner)) => Ok(inner),
                Some(other) => {
                    // Put the mismatched value back so the stack is unchanged
                    let actual = other.kind();
                    self.values.push(other);
                    Err(Error::type_mismatch($expected, actual))
                }
                None => Err(Error::StackUnderflow {
                    needed: 1,
                    depth: 0,
                }),
            }
        }
    };
}

impl Stack {
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    /// Push a data value.
    ///
    /// Commands are invoked, never stored as data, so pushing one is a
    /// contract violation by the caller and is rejected without touching the
    /// stack.
    pub fn push(&mut self, value: Value) -> Result<(), Error> {
        if let Value::Command(command) = &value {
            return Err(Error::type_mismatch(
                format!("a data value (`{}` must be invoked, not pushed)", command.name()),
                ValueKind::Command,
            ));
        }
        self.values.push(value);
        Ok(())
    }

    pub fn push_integer(&mut self, n: IntegerType) {
        self.values.push(Value::Integer(n));
    }

    pub fn push_string(&mut self, s: impl Into<String>) {
        self.values.push(Value::String(s.into()));
    }

    pub fn pop(&mut self) -> Result<Value, Error> {
        self.values.pop().ok_or(Error::StackUnderflow {
            needed: 1,
            depth: 0,
        })
    }

    typed_pop!(pop_integer, Integer, IntegerType, "Integer");
    typed_pop!(pop_string, String, String, "String");
    typed_pop!(pop_list, List, ListRef, "List");
    typed_pop!(pop_map, Map, MapRef, "Map");
    typed_pop!(pop_program, Program, Rc<Program>, "Program");

    /// The value `n` positions below the top (0 is the top)
    pub fn peek(&self, n: usize) -> Result<&Value, Error> {
        self.require(n + 1)?;
        Ok(&self.values[self.values.len() - 1 - n])
    }

    /// Fail with StackUnderflow unless at least `needed` values are present
    pub fn require(&self, needed: usize) -> Result<(), Error> {
        if self.values.len() < needed {
            Err(Error::StackUnderflow {
                needed,
                depth: self.values.len(),
            })
        } else {
            Ok(())
        }
    }

    /// The top `n` values without removing them, deepest first
    pub fn top(&self, n: usize) -> Result<&[Value], Error> {
        self.require(n)?;
        Ok(&self.values[self.values.len() - n..])
    }

    /// Remove the top `n` values, returned in stack order (deepest first)
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Error> {
        self.require(n)?;
        let split = self.values.len() - n;
        Ok(self.values.split_off(split))
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// All values, bottom first
    pub fn items(&self) -> &[Value] {
        &self.values
    }
}
