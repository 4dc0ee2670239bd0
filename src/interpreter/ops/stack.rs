use super::Flow;
use crate::interpreter::engine::Engine;
use crate::interpreter::errors::ErrorCode;
use crate::memory::value::{DataType, Value};
use crate::program::{Instruction, Mode};

/// Tag given to a slot moved by a typed `PUSH`/`POP`. Vectors travel as
/// three Float components.
fn slot_type(ty: DataType) -> DataType {
    match ty {
        DataType::Vector => DataType::Float,
        other => other,
    }
}

impl Engine {
    pub(crate) fn op_push(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        let ty = slot_type(instr.data_type);
        let value = match instr.mode {
            Mode::IMMEDIATE => Value::from_bits(ty, instr.operand),
            Mode::REFERENCE => self.read_variable(task_id, instr.operand).retag(ty),
            Mode(other) => {
                self.signal(ErrorCode::InvalidOperand, "PUSH", other);
                return Flow::Next;
            }
        };
        self.push(value);
        Flow::Next
    }

    pub(crate) fn op_pop(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        match instr.mode {
            Mode::IMMEDIATE => {
                self.pop();
            }
            Mode::REFERENCE => {
                let value = self.pop().retag(slot_type(instr.data_type));
                self.write_variable(task_id, instr.operand, value);
            }
            Mode(other) => self.signal(ErrorCode::InvalidOperand, "POP", other),
        }
        Flow::Next
    }

    /// Exchange the top two slots, or copy between the top and the slot
    /// `operand` entries below it when typed Int with a nonzero operand
    pub(crate) fn op_swap(&mut self, instr: &Instruction) -> Flow {
        let depth = instr.operand as usize;
        if instr.data_type != DataType::Int || depth == 0 {
            let result = match self.current_stack_mut() {
                Some(stack) => stack.swap_top(),
                None => Err(ErrorCode::StackEmpty),
            };
            if let Err(code) = result {
                self.signal(code, "SWAP", 0);
            }
            return Flow::Next;
        }

        match instr.mode {
            Mode::COPY_FROM => {
                let value = self
                    .current_stack()
                    .and_then(|stack| stack.peek(depth).copied());
                match value {
                    Some(value) => self.push(value),
                    None => self.signal(ErrorCode::StackEmpty, "COPY", instr.operand),
                }
            }
            _ => {
                let copied = self.current_stack_mut().is_some_and(|stack| {
                    match (stack.peek(0).copied(), stack.peek_mut(depth)) {
                        (Some(top), Some(slot)) => {
                            *slot = top;
                            true
                        }
                        _ => false,
                    }
                });
                if !copied {
                    self.signal(ErrorCode::StackEmpty, "COPY", instr.operand);
                }
            }
        }
        Flow::Next
    }

    /// Retag the top slot, or (zero mode) reset a variable to `Float 0`
    pub(crate) fn op_cast(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        if instr.mode == Mode::ZERO {
            self.write_variable(task_id, instr.operand, Value::default());
            return Flow::Next;
        }

        let retagged = self
            .current_stack_mut()
            .and_then(|stack| stack.peek_mut(0))
            .map(|top| *top = top.retag(instr.data_type))
            .is_some();
        if !retagged {
            self.signal(ErrorCode::StackEmpty, "CAST", 0);
        }
        Flow::Next
    }
}
