use super::Flow;
use crate::interpreter::engine::Engine;
use crate::interpreter::errors::ErrorCode;
use crate::memory::value::{DataType, Value};
use crate::program::Instruction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "ADD",
            ArithOp::Sub => "SUB",
            ArithOp::Mul => "MUL",
            ArithOp::Div => "DIV",
            ArithOp::Mod => "MOD",
        }
    }

    /// Integer result, or None on division by zero
    fn apply_int(self, a: i32, b: i32) -> Option<i32> {
        match self {
            ArithOp::Add => Some(a.wrapping_add(b)),
            ArithOp::Sub => Some(a.wrapping_sub(b)),
            ArithOp::Mul => Some(a.wrapping_mul(b)),
            ArithOp::Div => (b != 0).then(|| a.wrapping_div(b)),
            ArithOp::Mod => (b != 0).then(|| a.wrapping_rem(b)),
        }
    }

    /// Float result, or None on division by zero. `%` keeps the sign of the
    /// dividend, like C's `fmod`.
    fn apply_float(self, a: f32, b: f32) -> Option<f32> {
        match self {
            ArithOp::Add => Some(a + b),
            ArithOp::Sub => Some(a - b),
            ArithOp::Mul => Some(a * b),
            ArithOp::Div => (b != 0.0).then(|| a / b),
            ArithOp::Mod => (b != 0.0).then(|| a % b),
        }
    }
}

impl Engine {
    pub(crate) fn op_add(&mut self, instr: &Instruction) -> Flow {
        self.binary_arith(instr, ArithOp::Add)
    }

    pub(crate) fn op_sub(&mut self, instr: &Instruction) -> Flow {
        self.binary_arith(instr, ArithOp::Sub)
    }

    pub(crate) fn op_mul(&mut self, instr: &Instruction) -> Flow {
        self.binary_arith(instr, ArithOp::Mul)
    }

    pub(crate) fn op_div(&mut self, instr: &Instruction) -> Flow {
        self.binary_arith(instr, ArithOp::Div)
    }

    pub(crate) fn op_mod(&mut self, instr: &Instruction) -> Flow {
        self.binary_arith(instr, ArithOp::Mod)
    }

    fn binary_arith(&mut self, instr: &Instruction, op: ArithOp) -> Flow {
        match instr.data_type {
            DataType::Int => {
                let b = self.pop().as_int();
                let a = self.pop().as_int();
                let result = op.apply_int(a, b).unwrap_or_else(|| {
                    self.signal(ErrorCode::DivByZero, op.name(), 0);
                    0
                });
                self.push(Value::Int(result));
            }
            DataType::Float => {
                let b = self.pop().as_float();
                let a = self.pop().as_float();
                let result = op.apply_float(a, b).unwrap_or_else(|| {
                    self.signal(ErrorCode::DivByZero, op.name(), 0);
                    0.0
                });
                self.push(Value::Float(result));
            }
            DataType::Vector => {
                let b = self.pop_vector();
                let a = self.pop_vector();
                let mut divided_by_zero = false;
                for (x, y) in a.into_iter().zip(b) {
                    let component = op.apply_float(x, y).unwrap_or_else(|| {
                        divided_by_zero = true;
                        0.0
                    });
                    self.push(Value::Float(component));
                }
                if divided_by_zero {
                    self.signal(ErrorCode::DivByZero, op.name(), 0);
                }
            }
            other => {
                self.pop();
                self.pop();
                self.push(Value::zero(other));
                self.signal(ErrorCode::InvalidType, op.name(), other as u32);
            }
        }
        Flow::Next
    }

    pub(crate) fn op_neg(&mut self, instr: &Instruction) -> Flow {
        match instr.data_type {
            DataType::Int => {
                let a = self.pop().as_int();
                self.push(Value::Int(a.wrapping_neg()));
            }
            DataType::Float => {
                let a = self.pop().as_float();
                self.push(Value::Float(-a));
            }
            DataType::Vector => {
                let [x, y, z] = self.pop_vector();
                self.push_vector(-x, -y, -z);
            }
            other => {
                self.pop();
                self.push(Value::zero(other));
                self.signal(ErrorCode::InvalidType, "NEG", other as u32);
            }
        }
        Flow::Next
    }
}
