//! Bytecode instruction representation
//!
//! An [`Instruction`] is a fixed 20-byte record: opcode, mode, type tag,
//! 4-byte operand and source line, each stored as a 32-bit field. This layer
//! carries no execution semantics.

use crate::memory::value::{DataType, Value};
use std::fmt;

/// The 31 opcodes, numbered as they appear in program images
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    End = 0,
    Jz = 1,
    Push = 2,
    Pop = 3,
    Add = 4,
    Sys = 5,
    Sub = 6,
    Neg = 7,
    Mul = 8,
    Div = 9,
    Mod = 10,
    Not = 11,
    And = 12,
    Or = 13,
    Eq = 14,
    Ne = 15,
    Ge = 16,
    Le = 17,
    Gt = 18,
    Lt = 19,
    Jmp = 20,
    Sleep = 21,
    Except = 22,
    Cast = 23,
    Call = 24,
    EndExcept = 25,
    RetExcept = 26,
    IterExcept = 27,
    BrkExcept = 28,
    Swap = 29,
    Line = 30,
}

impl Opcode {
    pub const COUNT: usize = 31;

    pub const ALL: [Opcode; Opcode::COUNT] = [
        Opcode::End,
        Opcode::Jz,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Add,
        Opcode::Sys,
        Opcode::Sub,
        Opcode::Neg,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Not,
        Opcode::And,
        Opcode::Or,
        Opcode::Eq,
        Opcode::Ne,
        Opcode::Ge,
        Opcode::Le,
        Opcode::Gt,
        Opcode::Lt,
        Opcode::Jmp,
        Opcode::Sleep,
        Opcode::Except,
        Opcode::Cast,
        Opcode::Call,
        Opcode::EndExcept,
        Opcode::RetExcept,
        Opcode::IterExcept,
        Opcode::BrkExcept,
        Opcode::Swap,
        Opcode::Line,
    ];

    /// Convert a raw opcode number
    pub fn from_u32(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::End => "END",
            Opcode::Jz => "JZ",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Add => "ADD",
            Opcode::Sys => "SYS",
            Opcode::Sub => "SUB",
            Opcode::Neg => "NEG",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Not => "NOT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Ge => "GE",
            Opcode::Le => "LE",
            Opcode::Gt => "GT",
            Opcode::Lt => "LT",
            Opcode::Jmp => "JMP",
            Opcode::Sleep => "SLEEP",
            Opcode::Except => "EXCEPT",
            Opcode::Cast => "CAST",
            Opcode::Call => "CALL",
            Opcode::EndExcept => "ENDEXCEPT",
            Opcode::RetExcept => "RETEXCEPT",
            Opcode::IterExcept => "ITEREXCEPT",
            Opcode::BrkExcept => "BRKEXCEPT",
            Opcode::Swap => "SWAP",
            Opcode::Line => "LINE",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw addressing/variant field. Its meaning depends on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mode(pub u32);

impl Mode {
    // PUSH / POP
    pub const IMMEDIATE: Mode = Mode(0);
    pub const REFERENCE: Mode = Mode(1);
    // JZ / JMP
    pub const BACKWARD: Mode = Mode(0);
    pub const FORWARD: Mode = Mode(1);
    // CALL
    pub const SYNC: Mode = Mode(0);
    pub const ASYNC: Mode = Mode(1);
    // CAST
    pub const CAST: Mode = Mode(0);
    pub const ZERO: Mode = Mode(1);
    // ENDEXCEPT
    pub const END_EXCEPT: Mode = Mode(0);
    pub const YIELD: Mode = Mode(1);
    // SWAP
    pub const COPY_TO: Mode = Mode(0);
    pub const COPY_FROM: Mode = Mode(1);
}

/// One bytecode record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub mode: Mode,
    pub data_type: DataType,
    pub operand: u32,
    pub line: u32,
}

impl Instruction {
    /// Size of one record in a program image
    pub const ENCODED_SIZE: usize = 20;

    pub fn new(opcode: Opcode, mode: Mode, data_type: DataType, operand: u32) -> Self {
        Instruction {
            opcode,
            mode,
            data_type,
            operand,
            line: 0,
        }
    }

    /// An instruction with no mode, type or operand
    pub fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, Mode::default(), DataType::None, 0)
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// `PUSH` of an immediate value, typed by the value
    pub fn push(value: Value) -> Self {
        Self::new(Opcode::Push, Mode::IMMEDIATE, value.data_type(), value.bits())
    }

    /// `PUSH` of a variable by id
    pub fn push_var(ty: DataType, id: u32) -> Self {
        Self::new(Opcode::Push, Mode::REFERENCE, ty, id)
    }

    /// `POP` into a variable by id
    pub fn pop_var(ty: DataType, id: u32) -> Self {
        Self::new(Opcode::Pop, Mode::REFERENCE, ty, id)
    }

    /// A typed operator with no operand (`ADD`, `EQ`, ...)
    pub fn typed(opcode: Opcode, ty: DataType) -> Self {
        Self::new(opcode, Mode::default(), ty, 0)
    }

    /// Operand read as a signed integer
    pub fn int_operand(&self) -> i32 {
        self.operand as i32
    }

    /// Operand read as a float
    pub fn float_operand(&self) -> f32 {
        f32::from_bits(self.operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_numbers_are_dense() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(*op as usize, i);
            assert_eq!(Opcode::from_u32(i as u32), Some(*op));
        }
        assert_eq!(Opcode::from_u32(31), None);
    }

    #[test]
    fn push_carries_value_bits() {
        let instr = Instruction::push(Value::Float(2.5));
        assert_eq!(instr.data_type, DataType::Float);
        assert_eq!(instr.float_operand(), 2.5);
        assert_eq!(instr.mode, Mode::IMMEDIATE);
    }
}
