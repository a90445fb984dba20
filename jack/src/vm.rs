//! VM instruction output.
//!
//! The compiler's only output channel: a textual stack machine
//! instruction stream, one instruction per line, in program order.
use std::fmt::{self, Write as FmtWrite};

/// Named memory segment addressed by push and pop instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    /// Parse a segment name as it appears in instruction text.
    #[rustfmt::skip]
    pub fn parse(text: impl AsRef<str>) -> Option<Self> {
        match text.as_ref() {
            "constant" => Some(Self::Constant),
            "argument" => Some(Self::Argument),
            "local"    => Some(Self::Local),
            "static"   => Some(Self::Static),
            "this"     => Some(Self::This),
            "that"     => Some(Self::That),
            "pointer"  => Some(Self::Pointer),
            "temp"     => Some(Self::Temp),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Constant => write!(f, "constant"),
            Self::Argument => write!(f, "argument"),
            Self::Local    => write!(f, "local"),
            Self::Static   => write!(f, "static"),
            Self::This     => write!(f, "this"),
            Self::That     => write!(f, "that"),
            Self::Pointer  => write!(f, "pointer"),
            Self::Temp     => write!(f, "temp"),
        }
    }
}

/// Arithmetic and logical instructions.
///
/// Each pops its operands off the stack and pushes one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VmOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for VmOp {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Neg => write!(f, "neg"),
            Self::Eq  => write!(f, "eq"),
            Self::Gt  => write!(f, "gt"),
            Self::Lt  => write!(f, "lt"),
            Self::And => write!(f, "and"),
            Self::Or  => write!(f, "or"),
            Self::Not => write!(f, "not"),
        }
    }
}

/// Append-only instruction sink.
///
/// One instruction per call, written out immediately. Nothing is
/// buffered or reordered; emission order is program order.
pub struct VmWriter<W> {
    out: W,
}

impl<W: FmtWrite> VmWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn push(&mut self, segment: Segment, index: u16) -> fmt::Result {
        writeln!(self.out, "push {segment} {index}")
    }

    pub fn pop(&mut self, segment: Segment, index: u16) -> fmt::Result {
        writeln!(self.out, "pop {segment} {index}")
    }

    pub fn arithmetic(&mut self, op: VmOp) -> fmt::Result {
        writeln!(self.out, "{op}")
    }

    pub fn label(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "label {name}")
    }

    pub fn goto(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "goto {name}")
    }

    pub fn if_goto(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "if-goto {name}")
    }

    pub fn call(&mut self, name: &str, args: u16) -> fmt::Result {
        writeln!(self.out, "call {name} {args}")
    }

    pub fn function(&mut self, name: &str, locals: u16) -> fmt::Result {
        writeln!(self.out, "function {name} {locals}")
    }

    pub fn ret(&mut self) -> fmt::Result {
        writeln!(self.out, "return")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_instructions(f: impl FnOnce(&mut VmWriter<String>) -> fmt::Result) -> String {
        let mut writer = VmWriter::new(String::new());
        f(&mut writer).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_instruction_text() {
        let out = write_instructions(|w| {
            w.function("Main.main", 2)?;
            w.push(Segment::Constant, 7)?;
            w.pop(Segment::Local, 0)?;
            w.push(Segment::Local, 0)?;
            w.push(Segment::Argument, 1)?;
            w.arithmetic(VmOp::Add)?;
            w.label("WHILE_EXP0")?;
            w.arithmetic(VmOp::Not)?;
            w.if_goto("WHILE_END0")?;
            w.goto("WHILE_EXP0")?;
            w.label("WHILE_END0")?;
            w.call("Math.multiply", 2)?;
            w.ret()
        });

        assert_eq!(
            out,
            "function Main.main 2\n\
             push constant 7\n\
             pop local 0\n\
             push local 0\n\
             push argument 1\n\
             add\n\
             label WHILE_EXP0\n\
             not\n\
             if-goto WHILE_END0\n\
             goto WHILE_EXP0\n\
             label WHILE_END0\n\
             call Math.multiply 2\n\
             return\n"
        );
    }

    #[test]
    fn test_segment_names_round_trip() {
        let segments = [
            Segment::Constant,
            Segment::Argument,
            Segment::Local,
            Segment::Static,
            Segment::This,
            Segment::That,
            Segment::Pointer,
            Segment::Temp,
        ];

        for segment in segments {
            assert_eq!(Segment::parse(segment.to_string()), Some(segment));
        }

        assert_eq!(Segment::parse("register"), None);
    }

    #[test]
    fn test_op_names() {
        let ops = [
            (VmOp::Add, "add"),
            (VmOp::Sub, "sub"),
            (VmOp::Neg, "neg"),
            (VmOp::Eq, "eq"),
            (VmOp::Gt, "gt"),
            (VmOp::Lt, "lt"),
            (VmOp::And, "and"),
            (VmOp::Or, "or"),
            (VmOp::Not, "not"),
        ];

        for (op, name) in ops {
            assert_eq!(op.to_string(), name);
        }
    }
}
