//! VM Interpreter

use std::io::{self, BufRead, Write};

use crate::builtins;
use crate::bytecode::{Builtin, CompareJumpKind, Instruction, Op, PattKind};
use crate::bytefile::Bytefile;
use crate::frame::{Frame, Namespace};
use crate::numeric::LeBytes;
use crate::value::{Designator, MAX_SEXP_ARITY, Value};

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Global => write!(f, "Global"),
            Namespace::Local => write!(f, "Local"),
            Namespace::Argument => write!(f, "Argument"),
            Namespace::Captured => write!(f, "Captured"),
        }
    }
}

#[derive(Debug)]
pub enum InterpreterError {
    StackUnderflow,
    StackOverflow,
    CallStackOverflow,
    ReadingMoreThanCodeSection,
    InvalidOpcode(u8),
    InvalidType(String),
    OutOfBoundsAccess(i64, i64),
    StringIndexOutOfBounds,
    InvalidJumpOffset(usize, u32, usize),
    NotEnoughArguments(&'static str),
    InvalidStoreIndex(Namespace, u32, usize),
    InvalidLoadIndex(Namespace, u32, usize),
    MathError,
    Fail { line: i32, column: i32 },
    Io(io::Error),
}

impl From<u8> for InterpreterError {
    fn from(opcode: u8) -> Self {
        InterpreterError::InvalidOpcode(opcode)
    }
}

impl std::fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpreterError::StackUnderflow => write!(f, "Stack underflow"),
            InterpreterError::StackOverflow => write!(f, "Operand stack overflow"),
            InterpreterError::CallStackOverflow => write!(f, "Call stack overflow"),
            InterpreterError::ReadingMoreThanCodeSection => {
                write!(f, "Reading more bytes than code section currently has")
            }
            InterpreterError::InvalidOpcode(opcode) => write!(f, "Invalid opcode: {:#x}", opcode),
            InterpreterError::InvalidType(name) => write!(f, "Invalid type: {}", name),
            InterpreterError::OutOfBoundsAccess(index, length) => write!(
                f,
                "Out of bounds access at index {} with length {}",
                index, length
            ),
            InterpreterError::StringIndexOutOfBounds => {
                write!(f, "String index out of bounds")
            }
            InterpreterError::InvalidJumpOffset(ip, offset, code_len) => write!(
                f,
                "Invalid jump offset: current ip at {}, offset is {}, but code length is {}",
                ip, offset, code_len
            ),
            InterpreterError::NotEnoughArguments(instr) => {
                write!(f, "Not enough arguments for instruction `{}`", instr)
            }
            InterpreterError::InvalidStoreIndex(ns, index, n) => {
                write!(f, "Invalid store index {}/{} for {}", index, n, ns)
            }
            InterpreterError::InvalidLoadIndex(ns, index, n) => {
                write!(f, "Invalid load index {}/{} for {}", index, n, ns)
            }
            InterpreterError::MathError => write!(f, "Division or modulo by zero"),
            InterpreterError::Fail { line, column } => {
                write!(f, "Failed matching at line {} column {}", line, column)
            }
            InterpreterError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for InterpreterError {}

const MAX_OPERAND_STACK_SIZE: usize = 0xffff;
const MAX_CALL_STACK_SIZE: usize = 10_000;

pub struct Interpreter<R: BufRead, W: Write> {
    value_stack: Vec<Value>,
    call_stack: Vec<(usize, Frame)>,
    current_frame: Frame,
    bf: Bytefile,
    ip: usize,
    code_section_len: usize,
    globals: Vec<Value>,
    halted: bool,
    stdin: R,
    stdout: W,
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn new(bf: Bytefile, stdin: R, stdout: W) -> Self {
        let global_area_size = bf.global_area_size as usize;
        let code_section_len = bf.code_section.len();

        Interpreter {
            value_stack: Vec::new(),
            call_stack: Vec::new(),
            current_frame: Frame::default(),
            bf,
            ip: 0,
            code_section_len,
            globals: vec![Value::Empty; global_area_size],
            halted: false,
            stdin,
            stdout,
        }
    }

    /// Run the interpreter on a given instruction sequence directly,
    /// bypassing the byte-level decoder. Useful for unit tests.
    #[cfg(test)]
    pub fn run_on_program(&mut self, program: Vec<Instruction>) -> Result<(), InterpreterError> {
        for instr in program {
            self.eval(&instr)?;
        }
        Ok(())
    }

    fn next<T: LeBytes>(&mut self) -> Result<T, InterpreterError> {
        #[cfg(feature = "runtime_checks")]
        if self.ip + std::mem::size_of::<T>() > self.code_section_len {
            return Err(InterpreterError::ReadingMoreThanCodeSection);
        }

        let size = std::mem::size_of::<T>();
        let bytes = &self.bf.code_section[self.ip..self.ip + size];
        self.ip += size;

        Ok(T::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn decode_namespace(&self, byte: u8, code: u8) -> Result<Namespace, InterpreterError> {
        Namespace::from_code(code).ok_or(InterpreterError::from(byte))
    }

    /// Main interpreter loop: fetch, decode, execute until a `STOP` or an
    /// `END`/`RET` with an empty call stack.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        while !self.halted && self.ip < self.code_section_len {
            let encoding = self.next::<u8>()?;
            let instr = self.decode(encoding)?;

            if cfg!(feature = "verbose") {
                eprintln!("[ip={}] {:?}", self.ip, instr);
            }

            self.eval(&instr)?;
        }

        Ok(())
    }

    fn decode(&mut self, byte: u8) -> Result<Instruction, InterpreterError> {
        let (group, variant) = (byte & 0xF0, byte & 0x0F);

        match (group, variant) {
            (0x00, v) if (1..=13).contains(&v) => Ok(Instruction::Binop(
                Op::try_from(v).map_err(InterpreterError::from)?,
            )),
            (0x10, 0x0) => Ok(Instruction::Const(self.next::<i32>()?)),
            (0x10, 0x1) => Ok(Instruction::String(self.next::<i32>()? as u32)),
            (0x10, 0x2) => {
                let tag_offset = self.next::<i32>()? as u32;
                let arity = self.next::<i32>()? as u32;
                Ok(Instruction::Sexp { tag_offset, arity })
            }
            (0x10, 0x3) => Ok(Instruction::Sti),
            (0x10, 0x4) => Ok(Instruction::Sta),
            (0x10, 0x5) => Ok(Instruction::Jmp(self.next::<i32>()? as u32)),
            (0x10, 0x6) => Ok(Instruction::End),
            (0x10, 0x7) => Ok(Instruction::Ret),
            (0x10, 0x8) => Ok(Instruction::Drop),
            (0x10, 0x9) => Ok(Instruction::Dup),
            (0x10, 0xa) => Ok(Instruction::Swap),
            (0x10, 0xb) => Ok(Instruction::Elem),
            (0x20, v) if v <= 3 => {
                let namespace = self.decode_namespace(byte, v)?;
                let index = self.next::<i32>()? as u32;
                Ok(Instruction::Load { namespace, index })
            }
            (0x30, v) if v <= 3 => {
                let namespace = self.decode_namespace(byte, v)?;
                let index = self.next::<i32>()? as u32;
                Ok(Instruction::Loadref { namespace, index })
            }
            (0x40, v) if v <= 3 => {
                let namespace = self.decode_namespace(byte, v)?;
                let index = self.next::<i32>()? as u32;
                Ok(Instruction::Store { namespace, index })
            }
            (0x50, 0x0) => Ok(Instruction::Cjmp {
                kind: CompareJumpKind::IsZero,
                target: self.next::<i32>()? as u32,
            }),
            (0x50, 0x1) => Ok(Instruction::Cjmp {
                kind: CompareJumpKind::IsNonZero,
                target: self.next::<i32>()? as u32,
            }),
            (0x50, 0x2) => {
                let args = self.next::<i32>()? as u32;
                let locals = self.next::<i32>()? as u32;
                Ok(Instruction::Begin { args, locals })
            }
            (0x50, 0x3) => {
                let args = self.next::<i32>()? as u32;
                let locals = self.next::<i32>()? as u32;
                Ok(Instruction::Cbegin { args, locals })
            }
            (0x50, 0x4) => {
                let code_ip = self.next::<i32>()? as u32;
                let n = self.next::<i32>()? as u32;
                let mut captures = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let ns_byte = self.next::<u8>()?;
                    let namespace = Namespace::from_code(ns_byte).ok_or(ns_byte)?;
                    let index = self.next::<i32>()? as u32;
                    captures.push(crate::bytecode::CapturedVar { namespace, index });
                }
                Ok(Instruction::Closure { code_ip, captures })
            }
            (0x50, 0x5) => Ok(Instruction::Callc {
                args: self.next::<i32>()? as u32,
            }),
            (0x50, 0x6) => {
                let code_ip = self.next::<i32>()? as u32;
                let args = self.next::<i32>()? as u32;
                Ok(Instruction::Call { code_ip, args })
            }
            (0x50, 0x7) => {
                let name_offset = self.next::<i32>()? as u32;
                let arity = self.next::<i32>()? as u32;
                Ok(Instruction::Tag { name_offset, arity })
            }
            (0x50, 0x8) => Ok(Instruction::Array {
                size: self.next::<i32>()? as u32,
            }),
            (0x50, 0x9) => {
                let line = self.next::<i32>()?;
                let col = self.next::<i32>()?;
                Ok(Instruction::Fail { line, col })
            }
            (0x50, 0xa) => Ok(Instruction::Line(self.next::<i32>()?)),
            (0x60, v) if v <= 6 => Ok(Instruction::Patt(
                PattKind::try_from(v).map_err(InterpreterError::from)?,
            )),
            (0x70, v) if v <= 3 => Ok(Instruction::CallBuiltin(
                Builtin::try_from(v).map_err(InterpreterError::from)?,
            )),
            (0x70, 0x4) => Ok(Instruction::ArrayBuiltin {
                size: self.next::<i32>()? as u32,
            }),
            (0x70, 0x5) => Ok(Instruction::CallBuiltin(Builtin::Elem)),
            (0xf0, _) => Ok(Instruction::Stop),
            _ => Err(InterpreterError::InvalidOpcode(byte)),
        }
    }

    fn eval(&mut self, instr: &Instruction) -> Result<(), InterpreterError> {
        match instr {
            Instruction::Binop(op) => {
                let y = self.pop()?;
                let x = self.pop()?;
                let result = self.binop(*op, x, y)?;
                self.push(result)?;
            }
            Instruction::Const(value) => self.push(Value::Int(*value as i64))?,
            Instruction::String(offset) => {
                let bytes = self
                    .bf
                    .get_string_at_offset(*offset as usize)
                    .map_err(|_| InterpreterError::StringIndexOutOfBounds)?
                    .to_vec();
                self.push(Value::new_string(bytes))?;
            }
            Instruction::Sexp { tag_offset, arity } => {
                let tag = self.string_at(*tag_offset)?;
                let n = *arity as usize;
                #[cfg(feature = "runtime_checks")]
                if n > MAX_SEXP_ARITY {
                    return Err(InterpreterError::InvalidType(format!(
                        "SEXP arity {} exceeds maximum of {}",
                        n, MAX_SEXP_ARITY
                    )));
                }
                let mut children = vec![Value::Empty; n];
                for i in (0..n).rev() {
                    children[i] = self.pop()?;
                }
                self.push(Value::new_sexp(tag, children))?;
            }
            Instruction::Sti => {
                let v = self.pop()?;
                let r = self.pop()?;
                self.store_into_designator(&r, v.clone())?;
                self.push(v)?;
            }
            Instruction::Sta => {
                let v = self.pop()?;
                let j = self.pop()?;

                match &j {
                    Value::Reference(_) => {
                        self.store_into_designator(&j, v.clone())?;
                    }
                    Value::Int(index) => {
                        let container = self.pop()?;
                        self.store_into_container(&container, *index, &v)?;
                    }
                    _ => {
                        return Err(InterpreterError::InvalidType(
                            "STA expects a Reference or Int index".into(),
                        ));
                    }
                }

                self.push(v)?;
            }
            Instruction::Jmp(target) => {
                self.check_jump_target(*target)?;
                self.ip = *target as usize;
            }
            Instruction::End | Instruction::Ret => match self.call_stack.pop() {
                None => self.halted = true,
                Some((return_ip, saved_frame)) => {
                    self.ip = return_ip;
                    self.current_frame = saved_frame;
                }
            },
            Instruction::Drop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let v = self.pop()?;
                self.push(v.clone())?;
                self.push(v)?;
            }
            Instruction::Swap => {
                let top = self.pop()?;
                let below = self.pop()?;
                self.push(top)?;
                self.push(below)?;
            }
            Instruction::Elem => {
                let index = self.pop_int()?;
                let container = self.pop()?;
                let result = builtins::elem(&container, index)?;
                self.push(result)?;
            }
            Instruction::Load { namespace, index } => {
                let v = self.load_from_namespace(*namespace, *index)?;
                self.push(v)?;
            }
            Instruction::Loadref { namespace, index } => {
                self.check_namespace_index(*namespace, *index)?;
                self.push(Value::Reference(Designator {
                    namespace: *namespace,
                    index: *index as usize,
                }))?;
            }
            Instruction::Store { namespace, index } => {
                let v = self.peek()?.clone();
                self.store_into_namespace(*namespace, *index, v)?;
            }
            Instruction::Cjmp { kind, target } => {
                let value = self.pop_int()?;
                let branch = match kind {
                    CompareJumpKind::IsZero => value == 0,
                    CompareJumpKind::IsNonZero => value != 0,
                };
                if branch {
                    self.check_jump_target(*target)?;
                    self.ip = *target as usize;
                }
            }
            Instruction::Begin { locals, .. } | Instruction::Cbegin { locals, .. } => {
                self.current_frame.declare_locals(*locals as usize);
            }
            Instruction::Closure { code_ip, captures } => {
                let mut captured = Vec::with_capacity(captures.len());
                for c in captures {
                    captured.push(self.load_from_namespace(c.namespace, c.index)?);
                }
                self.push(Value::new_closure(*code_ip, captured))?;
            }
            Instruction::Call { code_ip, args } => {
                self.check_jump_target(*code_ip)?;
                let arg_values = self.pop_n(*args as usize)?;
                self.push_call(*code_ip, Frame::new(arg_values, Vec::new()))?;
            }
            Instruction::Callc { args } => {
                let closure_val = self.pop()?;
                let closure = match &closure_val {
                    Value::Closure(c) => c.clone(),
                    _ => {
                        return Err(InterpreterError::InvalidType(
                            "CALLC expects a Closure".into(),
                        ));
                    }
                };
                let arg_values = self.pop_n(*args as usize)?;
                self.push_call(
                    closure.code_ip,
                    Frame::new(arg_values, closure.captured.clone()),
                )?;
            }
            Instruction::Tag { name_offset, arity } => {
                let top = self.peek()?;
                let matches = match top {
                    Value::Sexp(s) => {
                        *s.tag == *self.string_at(*name_offset)?
                            && s.children.borrow().len() == *arity as usize
                    }
                    _ => false,
                };
                self.pop()?;
                self.push(Value::Int(matches as i64))?;
            }
            Instruction::Array { size } => {
                let top = self.pop()?;
                let matches = match &top {
                    Value::Array(a) => a.borrow().len() == *size as usize,
                    _ => false,
                };
                self.push(Value::Int(matches as i64))?;
            }
            Instruction::ArrayBuiltin { size } => {
                let n = *size as usize;
                let mut elements = vec![Value::Empty; n];
                for i in (0..n).rev() {
                    elements[i] = self.pop()?;
                }
                self.push(builtins::array(elements))?;
            }
            Instruction::Fail { line, col } => {
                return Err(InterpreterError::Fail {
                    line: *line,
                    column: *col,
                });
            }
            Instruction::Line(n) => {
                if cfg!(feature = "verbose") {
                    eprintln!("[line] {}", n);
                }
            }
            Instruction::Patt(kind) => {
                let result = match kind {
                    PattKind::StringEq => {
                        let y = self.pop()?;
                        let x = self.pop()?;
                        Value::strings_equal(&x, &y)
                    }
                    PattKind::IsString => matches!(self.pop()?, Value::String(_)),
                    PattKind::IsArray => matches!(self.pop()?, Value::Array(_)),
                    PattKind::IsSexp => matches!(self.pop()?, Value::Sexp(_)),
                    PattKind::IsNotInt => !matches!(self.pop()?, Value::Int(_)),
                    PattKind::IsInt => matches!(self.pop()?, Value::Int(_)),
                    PattKind::IsClosure => matches!(self.pop()?, Value::Closure(_)),
                };
                self.push(Value::Int(result as i64))?;
            }
            Instruction::CallBuiltin(builtin) => self.call_builtin(*builtin)?,
            Instruction::Stop => self.halted = true,
        }

        Ok(())
    }

    fn binop(&self, op: Op, x: Value, y: Value) -> Result<Value, InterpreterError> {
        if matches!(op, Op::Eq | Op::Neq) {
            let eq = Value::values_equal(&x, &y);
            return Ok(Value::Int(if matches!(op, Op::Eq) {
                eq as i64
            } else {
                (!eq) as i64
            }));
        }

        let xi = x
            .as_int()
            .ok_or_else(|| InterpreterError::InvalidType("BINOP expects Int operands".into()))?
            as i32;
        let yi = y
            .as_int()
            .ok_or_else(|| InterpreterError::InvalidType("BINOP expects Int operands".into()))?
            as i32;

        let result = match op {
            Op::Add => xi.wrapping_add(yi),
            Op::Sub => xi.wrapping_sub(yi),
            Op::Mul => xi.wrapping_mul(yi),
            Op::Div => {
                if yi == 0 {
                    return Err(InterpreterError::MathError);
                }
                xi.wrapping_div(yi)
            }
            Op::Mod => {
                if yi == 0 {
                    return Err(InterpreterError::MathError);
                }
                xi.wrapping_rem(yi)
            }
            Op::Lt => (xi < yi) as i32,
            Op::Leq => (xi <= yi) as i32,
            Op::Gt => (xi > yi) as i32,
            Op::Geq => (xi >= yi) as i32,
            Op::And => (xi != 0 && yi != 0) as i32,
            Op::Or => (xi != 0 || yi != 0) as i32,
            Op::Eq | Op::Neq => unreachable!(),
        };

        Ok(Value::Int(result as i64))
    }

    fn call_builtin(&mut self, builtin: Builtin) -> Result<(), InterpreterError> {
        match builtin {
            Builtin::Read => {
                let v = builtins::read(&mut self.stdin, &mut self.stdout)?;
                self.push(v)?;
            }
            Builtin::Write => {
                let v = self.pop()?;
                let result = builtins::write(&mut self.stdout, v)?;
                self.push(result)?;
            }
            Builtin::Length => {
                let v = self.pop()?;
                let result = builtins::length(&v)?;
                self.push(result)?;
            }
            Builtin::String => {
                let v = self.pop()?;
                self.push(builtins::string(&v))?;
            }
            // `array` carries its own INT32 operand and is decoded straight
            // to `Instruction::ArrayBuiltin`, never through this dispatch.
            Builtin::Array => unreachable!("array builtin decodes to Instruction::ArrayBuiltin"),
            Builtin::Elem => {
                let index = self.pop_int()?;
                let container = self.pop()?;
                let result = builtins::elem(&container, index)?;
                self.push(result)?;
            }
        }
        Ok(())
    }

    fn string_at(&self, offset: u32) -> Result<std::rc::Rc<str>, InterpreterError> {
        let bytes = self
            .bf
            .get_string_at_offset(offset as usize)
            .map_err(|_| InterpreterError::StringIndexOutOfBounds)?;
        Ok(std::rc::Rc::from(String::from_utf8_lossy(bytes).as_ref()))
    }

    fn check_jump_target(&self, target: u32) -> Result<(), InterpreterError> {
        #[cfg(feature = "runtime_checks")]
        if target as usize >= self.code_section_len {
            return Err(InterpreterError::InvalidJumpOffset(
                self.ip,
                target,
                self.code_section_len,
            ));
        }
        let _ = target;
        Ok(())
    }

    fn check_namespace_index(
        &self,
        namespace: Namespace,
        index: u32,
    ) -> Result<(), InterpreterError> {
        #[cfg(feature = "runtime_checks")]
        {
            let len = match namespace {
                Namespace::Global => self.globals.len(),
                Namespace::Local => self.current_frame.locals.len(),
                Namespace::Argument => self.current_frame.args.len(),
                Namespace::Captured => self.current_frame.captured.len(),
            };
            if index as usize >= len {
                return Err(InterpreterError::InvalidLoadIndex(namespace, index, len));
            }
        }
        let _ = (namespace, index);
        Ok(())
    }

    fn load_from_namespace(
        &self,
        namespace: Namespace,
        index: u32,
    ) -> Result<Value, InterpreterError> {
        self.check_namespace_index(namespace, index)?;
        let i = index as usize;
        Ok(match namespace {
            Namespace::Global => self.globals[i].clone(),
            Namespace::Local => self.current_frame.locals[i].clone(),
            Namespace::Argument => self.current_frame.args[i].clone(),
            Namespace::Captured => self.current_frame.captured[i].clone(),
        })
    }

    fn store_into_namespace(
        &mut self,
        namespace: Namespace,
        index: u32,
        value: Value,
    ) -> Result<(), InterpreterError> {
        self.check_namespace_index(namespace, index)?;
        let i = index as usize;
        match namespace {
            Namespace::Global => self.globals[i] = value,
            Namespace::Local => self.current_frame.locals[i] = value,
            Namespace::Argument => self.current_frame.args[i] = value,
            Namespace::Captured => self.current_frame.captured[i] = value,
        }
        Ok(())
    }

    fn store_into_designator(
        &mut self,
        designator: &Value,
        value: Value,
    ) -> Result<(), InterpreterError> {
        match designator {
            Value::Reference(d) => self.store_into_namespace(d.namespace, d.index as u32, value),
            _ => Err(InterpreterError::InvalidType(
                "expected a Reference value".into(),
            )),
        }
    }

    fn store_into_container(
        &self,
        container: &Value,
        index: i64,
        value: &Value,
    ) -> Result<(), InterpreterError> {
        if index < 0 {
            return Err(InterpreterError::OutOfBoundsAccess(index, 0));
        }
        let i = index as usize;

        match container {
            Value::String(s) => {
                let byte = value.as_int().ok_or_else(|| {
                    InterpreterError::InvalidType("STA into String expects Int".into())
                })? as u8;
                let mut bytes = s.borrow_mut();
                #[cfg(feature = "runtime_checks")]
                if i >= bytes.len() {
                    return Err(InterpreterError::OutOfBoundsAccess(
                        index,
                        bytes.len() as i64,
                    ));
                }
                bytes[i] = byte;
            }
            Value::Array(a) => {
                let mut elems = a.borrow_mut();
                #[cfg(feature = "runtime_checks")]
                if i >= elems.len() {
                    return Err(InterpreterError::OutOfBoundsAccess(
                        index,
                        elems.len() as i64,
                    ));
                }
                elems[i] = value.clone();
            }
            Value::Sexp(s) => {
                let mut children = s.children.borrow_mut();
                #[cfg(feature = "runtime_checks")]
                if i >= children.len() {
                    return Err(InterpreterError::OutOfBoundsAccess(
                        index,
                        children.len() as i64,
                    ));
                }
                children[i] = value.clone();
            }
            _ => {
                return Err(InterpreterError::InvalidType(
                    "STA expects a container (String/Array/Sexp)".into(),
                ));
            }
        }

        Ok(())
    }

    fn push_call(&mut self, target_ip: u32, new_frame: Frame) -> Result<(), InterpreterError> {
        if self.call_stack.len() >= MAX_CALL_STACK_SIZE {
            return Err(InterpreterError::CallStackOverflow);
        }
        let return_ip = self.ip;
        let old_frame = std::mem::replace(&mut self.current_frame, new_frame);
        self.call_stack.push((return_ip, old_frame));
        self.ip = target_ip as usize;
        Ok(())
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, InterpreterError> {
        // args[0] receives the last-pushed (first-popped) value.
        let mut values = vec![Value::Empty; n];
        for slot in values.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(values)
    }

    fn pop_int(&mut self) -> Result<i64, InterpreterError> {
        self.pop()?
            .as_int()
            .ok_or_else(|| InterpreterError::InvalidType("expected an Int".into()))
    }

    fn push(&mut self, value: Value) -> Result<(), InterpreterError> {
        #[cfg(feature = "runtime_checks")]
        if self.value_stack.len() >= MAX_OPERAND_STACK_SIZE {
            return Err(InterpreterError::StackOverflow);
        }
        self.value_stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, InterpreterError> {
        self.value_stack
            .pop()
            .ok_or(InterpreterError::StackUnderflow)
    }

    fn peek(&self) -> Result<&Value, InterpreterError> {
        self.value_stack
            .last()
            .ok_or(InterpreterError::StackUnderflow)
    }
}

#[cfg(test)]
mod tests;
