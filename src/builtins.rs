//! The six primitive operations reachable from bytecode via the
//! `CALL-builtin` opcode group (and, for `elem`, also via the dedicated
//! `ELEM` instruction).

use std::io::{BufRead, Write};

use crate::interpreter::InterpreterError;
use crate::stringify::stringify;
use crate::value::Value;

/// Print `"> "` and parse a decimal integer from stdin.
pub fn read(stdin: &mut dyn BufRead, stdout: &mut dyn Write) -> Result<Value, InterpreterError> {
    write!(stdout, "> ").map_err(InterpreterError::Io)?;
    stdout.flush().map_err(InterpreterError::Io)?;

    let mut line = String::new();
    stdin.read_line(&mut line).map_err(InterpreterError::Io)?;

    let value: i64 = line
        .trim()
        .parse()
        .map_err(|_| InterpreterError::InvalidType("expected a decimal integer on stdin".into()))?;

    Ok(Value::Int(value))
}

/// Print an Int followed by a newline; return Empty.
pub fn write(stdout: &mut dyn Write, value: Value) -> Result<Value, InterpreterError> {
    let i = value
        .as_int()
        .ok_or_else(|| InterpreterError::InvalidType("write expects an Int".into()))?;

    writeln!(stdout, "{}", i).map_err(InterpreterError::Io)?;
    Ok(Value::Empty)
}

/// Array length / String byte length / Sexp arity.
pub fn length(value: &Value) -> Result<Value, InterpreterError> {
    value
        .length()
        .map(|n| Value::Int(n as i64))
        .ok_or_else(|| InterpreterError::InvalidType("length expects a container".into()))
}

/// Structural rendering of any value.
pub fn string(value: &Value) -> Value {
    Value::new_string(stringify(value).into_bytes())
}

/// Build an Array from already-ordered elements (element 0 is the deepest
/// pop, per the `array` built-in's contract).
pub fn array(elements: Vec<Value>) -> Value {
    Value::new_array(elements)
}

/// Index into a String/Array/Sexp. String indexing yields a fresh Int of
/// the indexed byte.
pub fn elem(container: &Value, index: i64) -> Result<Value, InterpreterError> {
    if index < 0 {
        return Err(InterpreterError::OutOfBoundsAccess(index, 0));
    }
    let i = index as usize;

    match container {
        Value::String(s) => {
            let bytes = s.borrow();
            let byte = *bytes.get(i).ok_or(InterpreterError::OutOfBoundsAccess(
                index,
                bytes.len() as i64,
            ))?;
            Ok(Value::Int(byte as i64))
        }
        Value::Array(a) => {
            let elems = a.borrow();
            elems
                .get(i)
                .cloned()
                .ok_or(InterpreterError::OutOfBoundsAccess(
                    index,
                    elems.len() as i64,
                ))
        }
        Value::Sexp(s) => {
            let children = s.children.borrow();
            children
                .get(i)
                .cloned()
                .ok_or(InterpreterError::OutOfBoundsAccess(
                    index,
                    children.len() as i64,
                ))
        }
        _ => Err(InterpreterError::InvalidType(
            "elem expects a container".into(),
        )),
    }
}
