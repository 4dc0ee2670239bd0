use super::Flow;
use crate::interpreter::engine::Engine;
use crate::interpreter::errors::ErrorCode;
use crate::memory::value::Value;
use crate::program::{Instruction, Mode};
use tracing::debug;

impl Engine {
    /// Call native function `operand`. Unbound entries keep the stack
    /// balanced by consuming their inputs and producing zero outputs.
    pub(crate) fn op_sys(&mut self, instr: &Instruction) -> Flow {
        let id = instr.operand;
        let Some(func) = self.native(id) else {
            self.signal(ErrorCode::NativeFuncNotFound, "", id);
            return Flow::Next;
        };
        let (stack_in, stack_out) = (func.stack_in, func.stack_out);

        match func.implementation.clone() {
            Some(implementation) => {
                self.host_mut().native_call_enter(id);
                implementation(self);
                self.host_mut().native_call_exit(id);
            }
            None => {
                let name = func.name.clone();
                self.signal(ErrorCode::NativeFuncNotFound, &name, id);
                for _ in 0..stack_in {
                    self.pop();
                }
                for _ in 0..stack_out {
                    self.push(Value::Float(0.0));
                }
            }
        }
        Flow::Next
    }

    /// Start script `operand` as a new task. A synchronous call parks the
    /// caller on this instruction until the callee is gone.
    pub(crate) fn op_call(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        let callee = self.start_script(instr.operand);
        if callee == 0 || instr.mode == Mode::ASYNC {
            return Flow::Next;
        }
        match self.task_mut(task_id) {
            Some(task) => {
                task.waiting_task_id = callee;
                debug!(task = task_id, callee, "waiting on task");
                Flow::Stay
            }
            None => Flow::Next,
        }
    }
}
