//! Script-level exception handlers
//!
//! A task registers handler addresses with `EXCEPT`. Every tick the scheduler
//! diverts such a task to its most recent handler before its normal flow runs.
//! The handler code then either returns to the saved pointer (`RETEXCEPT`),
//! moves on to the previously registered handler (`ITEREXCEPT`), or drops all
//! handlers and continues in place (`BRKEXCEPT`).

use super::Flow;
use crate::interpreter::engine::Engine;
use crate::interpreter::errors::ErrorCode;
use crate::program::{Instruction, Mode};

impl Engine {
    pub(crate) fn op_except(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        if let Some(task) = self.task_mut(task_id) {
            task.exception_handlers.push(instr.operand);
        }
        Flow::Next
    }

    /// Unregister the most recent handler, or in yield mode end the tick
    pub(crate) fn op_end_except(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        let Some(task) = self.task_mut(task_id) else {
            return Flow::Stay;
        };
        if instr.mode == Mode::YIELD {
            task.yield_requested = true;
        } else if task.exception_handlers.pop().is_none() {
            self.signal(ErrorCode::InvalidOperand, "ENDEXCEPT", task_id);
        }
        Flow::Next
    }

    pub(crate) fn op_ret_except(&mut self, task_id: u32) -> Flow {
        let Some(task) = self.task_mut(task_id) else {
            return Flow::Stay;
        };
        if !task.in_exception_handler {
            self.signal(ErrorCode::InvalidOperand, "RETEXCEPT", task_id);
            return Flow::Next;
        }
        task.instruction_address = task.prev_instruction_address;
        task.in_exception_handler = false;
        Flow::Jump
    }

    pub(crate) fn op_iter_except(&mut self, task_id: u32) -> Flow {
        let Some(task) = self.task_mut(task_id) else {
            return Flow::Stay;
        };
        if !task.in_exception_handler || task.current_exception_handler_index == 0 {
            return self.op_ret_except(task_id);
        }
        task.current_exception_handler_index -= 1;
        match task.current_exception_handler() {
            Some(address) => {
                task.instruction_address = address;
                Flow::Jump
            }
            None => {
                self.signal(ErrorCode::InvalidOperand, "ITEREXCEPT", task_id);
                self.op_ret_except(task_id)
            }
        }
    }

    pub(crate) fn op_brk_except(&mut self, task_id: u32) -> Flow {
        if let Some(task) = self.task_mut(task_id) {
            task.exception_handlers.clear();
            task.in_exception_handler = false;
        }
        Flow::Next
    }
}
