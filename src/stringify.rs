//! Recursive, total rendering of any runtime `Value` to a human-readable
//! string, as used by the `string` built-in.

use crate::value::Value;

const CONS_TAG: &str = "cons";

pub fn stringify(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::String(s) => {
            out.push('"');
            out.push_str(&String::from_utf8_lossy(&s.borrow()));
            out.push('"');
        }
        Value::Array(elems) => {
            out.push('[');
            for (i, elem) in elems.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(elem, out);
            }
            out.push(']');
        }
        Value::Sexp(s) if &*s.tag == CONS_TAG && s.children.borrow().len() == 2 => {
            out.push('{');
            write_cons_spine(value, out);
            out.push('}');
        }
        Value::Sexp(s) => {
            out.push_str(&s.tag);
            let children = s.children.borrow();
            if !children.is_empty() {
                out.push('(');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_value(child, out);
                }
                out.push(')');
            }
        }
        // The reference implementation has no total rendering for these;
        // this rewrite picks empty string rather than propagating Option.
        Value::Reference(_) | Value::Empty | Value::Closure(_) => {}
    }
}

/// Walk the right spine of a `cons(head, tail)` chain as long as `tail` is
/// itself a `cons` of arity 2. A terminator of `Int(0)` closes the list
/// silently; any other terminator also stops the walk without emitting.
fn write_cons_spine(value: &Value, out: &mut String) {
    let mut current = value.clone();
    let mut first = true;
    loop {
        let next = match &current {
            Value::Sexp(s) if &*s.tag == CONS_TAG && s.children.borrow().len() == 2 => {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                let children = s.children.borrow();
                write_value(&children[0], out);
                children[1].clone()
            }
            _ => break,
        };
        current = next;
    }
}
