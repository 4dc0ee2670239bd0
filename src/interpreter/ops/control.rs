use super::Flow;
use crate::interpreter::engine::Engine;
use crate::memory::value::Value;
use crate::program::{Instruction, Mode};

impl Engine {
    /// Mark the task for removal by the next reap pass
    pub(crate) fn op_end(&mut self, task_id: u32) -> Flow {
        if let Some(task) = self.task_mut(task_id) {
            task.stop = true;
        }
        Flow::Stay
    }

    pub(crate) fn op_jz(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        if self.pop().is_truthy() {
            if let Some(task) = self.task_mut(task_id) {
                task.ticks = 0;
            }
            Flow::Next
        } else {
            self.jump(task_id, instr)
        }
    }

    pub(crate) fn op_jmp(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        self.jump(task_id, instr)
    }

    /// Jump to the absolute address in the operand. Backward jumps are loop
    /// edges and hand control back to the scheduler.
    fn jump(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        let Some(task) = self.task_mut(task_id) else {
            return Flow::Stay;
        };
        task.instruction_address = instr.operand;
        if instr.mode == Mode::BACKWARD {
            task.yield_requested = true;
        }
        Flow::Jump
    }

    /// Pop a duration in seconds and push whether the task's tick counter
    /// has reached it
    pub(crate) fn op_sleep(&mut self, task_id: u32) -> Flow {
        let seconds = self.pop().as_float();
        let tick_duration = self.config().tick_duration;
        let elapsed = match self.task_mut(task_id) {
            Some(task) => {
                let elapsed = task.ticks as f32 * tick_duration >= seconds;
                task.sleeping = !elapsed;
                elapsed
            }
            None => return Flow::Stay,
        };
        self.push(Value::bool(elapsed));
        Flow::Next
    }

    pub(crate) fn op_line(&mut self, instr: &Instruction) -> Flow {
        self.set_current_line(instr.operand);
        Flow::Next
    }
}
