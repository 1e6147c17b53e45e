use crate::Error;
use crate::evaluator::Interpreter;
use crate::stack::Stack;
use crate::value::{IntegerType, ListRef, MapKey, MapRef, Program, Value};
use std::rc::Rc;
use std::sync::Arc;

// NOTE: This module is internal plumbing for the word library.
// It turns strongly-typed Rust functions into the erased `WordFn`
// stored in the command registry, so that pure stack words can be
// written as ordinary functions of their operands.
//
// The adapters honor the calling convention: operands are converted
// from copies of the top of the stack, the function runs, and only
// when it succeeds are the operands popped and the results pushed.
// A failing word therefore leaves the stack exactly as it found it.

/// Canonical erased word type stored in the builtin table.
pub(crate) type WordFn = dyn Fn(&mut Interpreter) -> Result<(), Error> + Send + Sync;

// =====================================================================
// Operand conversion
// =====================================================================

/// Conversion from one stack operand to a typed parameter.
///
/// Composite operands (`ListRef`, `MapRef`) share storage with the
/// value on the stack, so a word can mutate a list in place and push
/// the same list back.
pub(crate) trait FromOperand: Sized {
    fn from_operand(value: Value) -> Result<Self, Error>;
}

impl FromOperand for Value {
    fn from_operand(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

impl FromOperand for MapKey {
    fn from_operand(value: Value) -> Result<Self, Error> {
        MapKey::try_from(value)
    }
}

macro_rules! impl_from_operand {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl FromOperand for $ty {
            fn from_operand(value: Value) -> Result<Self, Error> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(Error::type_mismatch($expected, other.kind())),
                }
            }
        }
    };
}

impl_from_operand!(IntegerType, Integer, "Integer");
impl_from_operand!(String, String, "String");
impl_from_operand!(ListRef, List, "List");
impl_from_operand!(MapRef, Map, "Map");
impl_from_operand!(Rc<Program>, Program, "Program");

// =====================================================================
// Result conversion
// =====================================================================

/// Internal trait that normalizes word return types to the values to
/// push, or the error that aborts the word.
///
/// `()` pushes nothing, `bool` pushes `1` or `0`, pairs push their
/// elements left to right and `Result<T, Error>` pushes `T` or fails.
pub(crate) trait IntoResults {
    fn into_results(self, out: &mut Vec<Value>) -> Result<(), Error>;
}

impl IntoResults for () {
    fn into_results(self, _out: &mut Vec<Value>) -> Result<(), Error> {
        Ok(())
    }
}

impl IntoResults for bool {
    fn into_results(self, out: &mut Vec<Value>) -> Result<(), Error> {
        out.push(Value::Integer(IntegerType::from(self)));
        Ok(())
    }
}

macro_rules! impl_into_results {
    ($ty:ty, $wrap:expr) => {
        impl IntoResults for $ty {
            fn into_results(self, out: &mut Vec<Value>) -> Result<(), Error> {
                out.push($wrap(self));
                Ok(())
            }
        }
    };
}

impl_into_results!(Value, std::convert::identity);
impl_into_results!(IntegerType, Value::Integer);
impl_into_results!(String, Value::String);
impl_into_results!(ListRef, Value::List);
impl_into_results!(MapRef, Value::Map);

impl<A: IntoResults, B: IntoResults> IntoResults for (A, B) {
    fn into_results(self, out: &mut Vec<Value>) -> Result<(), Error> {
        self.0.into_results(out)?;
        self.1.into_results(out)
    }
}

impl<A: IntoResults, B: IntoResults, C: IntoResults> IntoResults for (A, B, C) {
    fn into_results(self, out: &mut Vec<Value>) -> Result<(), Error> {
        self.0.into_results(out)?;
        self.1.into_results(out)?;
        self.2.into_results(out)
    }
}

impl<T: IntoResults> IntoResults for Result<T, Error> {
    fn into_results(self, out: &mut Vec<Value>) -> Result<(), Error> {
        self?.into_results(out)
    }
}

/// Replace the top `consumed` operands with `results`
fn commit(stack: &mut Stack, consumed: usize, results: Vec<Value>) -> Result<(), Error> {
    stack.pop_n(consumed)?;
    for value in results {
        stack.push(value)?;
    }
    Ok(())
}

// =====================================================================
// Fixed-arity adapters
// =====================================================================

/// Trait for converting strongly-typed Rust functions or closures into
/// the erased [`WordFn`], parameterized by an operand tuple type. The
/// first parameter is the deepest operand, the last is the top.
pub(crate) trait IntoWord<Args> {
    fn into_word(self) -> Arc<WordFn>;
}

// 0-operand words
impl<F, R> IntoWord<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoResults,
{
    fn into_word(self) -> Arc<WordFn> {
        Arc::new(move |interp: &mut Interpreter| {
            let mut results = Vec::new();
            (self)().into_results(&mut results)?;
            commit(interp.stack_mut(), 0, results)
        })
    }
}

/// Helper macro implementing `IntoWord` for a fixed operand count.
///
/// Operands are converted from clones of the top `$arity` values, so a
/// conversion failure or an error returned by the function leaves the
/// stack untouched.
macro_rules! impl_into_word_for_arity {
    ($arity:expr, $( $v:ident : $A:ident ),+ ) => {
        impl<F, R, $( $A ),+> IntoWord<( $( $A, )+ )> for F
        where
            F: Fn( $( $A ),+ ) -> R + Send + Sync + 'static,
            $( $A: FromOperand, )+
            R: IntoResults,
        {
            fn into_word(self) -> Arc<WordFn> {
                Arc::new(move |interp: &mut Interpreter| {
                    let stack = interp.stack_mut();
                    let mut operands = stack.top($arity)?.to_vec().into_iter();
                    $(
                        let $v = <$A as FromOperand>::from_operand(
                            operands.next().unwrap_or(Value::None),
                        )?;
                    )+
                    let mut results = Vec::new();
                    (self)( $( $v ),+ ).into_results(&mut results)?;
                    commit(stack, $arity, results)
                })
            }
        }
    };
}

impl_into_word_for_arity!(1, v0: A1);
impl_into_word_for_arity!(2, v0: A1, v1: A2);
impl_into_word_for_arity!(3, v0: A1, v1: A2, v2: A3);
