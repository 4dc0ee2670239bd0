use super::Flow;
use crate::interpreter::engine::Engine;
use crate::interpreter::errors::ErrorCode;
use crate::memory::value::{DataType, Value};
use crate::program::Instruction;
use std::cmp::Ordering;

impl Engine {
    pub(crate) fn op_not(&mut self) -> Flow {
        let a = self.pop().is_truthy();
        self.push(Value::bool(!a));
        Flow::Next
    }

    pub(crate) fn op_and(&mut self) -> Flow {
        let b = self.pop().is_truthy();
        let a = self.pop().is_truthy();
        self.push(Value::bool(a && b));
        Flow::Next
    }

    pub(crate) fn op_or(&mut self) -> Flow {
        let b = self.pop().is_truthy();
        let a = self.pop().is_truthy();
        self.push(Value::bool(a || b));
        Flow::Next
    }

    pub(crate) fn op_eq(&mut self, instr: &Instruction) -> Flow {
        let equal = self.pop_equality(instr.data_type, "EQ");
        self.push(Value::bool(equal.unwrap_or(false)));
        Flow::Next
    }

    pub(crate) fn op_ne(&mut self, instr: &Instruction) -> Flow {
        let equal = self.pop_equality(instr.data_type, "NE");
        self.push(Value::bool(equal.is_some_and(|eq| !eq)));
        Flow::Next
    }

    pub(crate) fn op_ge(&mut self, instr: &Instruction) -> Flow {
        self.ordering_test(instr, "GE", |ord| ord != Ordering::Less)
    }

    pub(crate) fn op_le(&mut self, instr: &Instruction) -> Flow {
        self.ordering_test(instr, "LE", |ord| ord != Ordering::Greater)
    }

    pub(crate) fn op_gt(&mut self, instr: &Instruction) -> Flow {
        self.ordering_test(instr, "GT", |ord| ord == Ordering::Greater)
    }

    pub(crate) fn op_lt(&mut self, instr: &Instruction) -> Flow {
        self.ordering_test(instr, "LT", |ord| ord == Ordering::Less)
    }

    /// Pop two operands of type `ty` and compare them for equality.
    /// Returns None (after signalling) for types without equality.
    fn pop_equality(&mut self, ty: DataType, name: &str) -> Option<bool> {
        match ty {
            DataType::Int | DataType::Boolean => {
                let b = self.pop().as_int();
                let a = self.pop().as_int();
                Some(a == b)
            }
            DataType::Float => {
                let b = self.pop().as_float();
                let a = self.pop().as_float();
                Some(a == b)
            }
            DataType::Vector => {
                let b = self.pop_vector();
                let a = self.pop_vector();
                Some(a == b)
            }
            DataType::Object => {
                let b = self.pop().as_object();
                let a = self.pop().as_object();
                Some(a == b)
            }
            other => {
                self.pop();
                self.pop();
                self.signal(ErrorCode::InvalidType, name, other as u32);
                None
            }
        }
    }

    /// `GE`/`LE`/`GT`/`LT`: Int and Float only. A NaN operand compares false.
    fn ordering_test(
        &mut self,
        instr: &Instruction,
        name: &str,
        test: impl Fn(Ordering) -> bool,
    ) -> Flow {
        let ordering = match instr.data_type {
            DataType::Int => {
                let b = self.pop().as_int();
                let a = self.pop().as_int();
                Some(a.cmp(&b))
            }
            DataType::Float => {
                let b = self.pop().as_float();
                let a = self.pop().as_float();
                a.partial_cmp(&b)
            }
            other => {
                self.pop();
                self.pop();
                self.signal(ErrorCode::InvalidType, name, other as u32);
                None
            }
        };
        self.push(Value::bool(ordering.is_some_and(test)));
        Flow::Next
    }
}
