//! Opcode implementations
//!
//! Each family lives in its own `impl Engine` block:
//! - [`stack`]: `PUSH`, `POP`, `SWAP`, `CAST`
//! - [`arith`]: `ADD`, `SUB`, `MUL`, `DIV`, `MOD`, `NEG`
//! - [`compare`]: `NOT`, `AND`, `OR`, `EQ`, `NE`, `GE`, `LE`, `GT`, `LT`
//! - [`control`]: `END`, `JZ`, `JMP`, `SLEEP`, `LINE`
//! - [`calls`]: `SYS`, `CALL`
//! - [`except`]: `EXCEPT`, `ENDEXCEPT`, `RETEXCEPT`, `ITEREXCEPT`, `BRKEXCEPT`
//!
//! Every handler receives the id of the running task and the instruction, and
//! returns a [`Flow`] telling the inner loop what to do with the pointer.

pub mod arith;
pub mod calls;
pub mod compare;
pub mod control;
pub mod except;
pub mod stack;

use crate::interpreter::engine::Engine;
use crate::program::{Instruction, Opcode};

/// What happens to the instruction pointer after an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Advance to the following instruction
    Next,
    /// The handler already moved the pointer
    Jump,
    /// Leave the pointer where it is
    Stay,
}

impl Engine {
    pub(crate) fn execute(&mut self, task_id: u32, instr: &Instruction) -> Flow {
        match instr.opcode {
            Opcode::End => self.op_end(task_id),
            Opcode::Jz => self.op_jz(task_id, instr),
            Opcode::Push => self.op_push(task_id, instr),
            Opcode::Pop => self.op_pop(task_id, instr),
            Opcode::Add => self.op_add(instr),
            Opcode::Sys => self.op_sys(instr),
            Opcode::Sub => self.op_sub(instr),
            Opcode::Neg => self.op_neg(instr),
            Opcode::Mul => self.op_mul(instr),
            Opcode::Div => self.op_div(instr),
            Opcode::Mod => self.op_mod(instr),
            Opcode::Not => self.op_not(),
            Opcode::And => self.op_and(),
            Opcode::Or => self.op_or(),
            Opcode::Eq => self.op_eq(instr),
            Opcode::Ne => self.op_ne(instr),
            Opcode::Ge => self.op_ge(instr),
            Opcode::Le => self.op_le(instr),
            Opcode::Gt => self.op_gt(instr),
            Opcode::Lt => self.op_lt(instr),
            Opcode::Jmp => self.op_jmp(task_id, instr),
            Opcode::Sleep => self.op_sleep(task_id),
            Opcode::Except => self.op_except(task_id, instr),
            Opcode::Cast => self.op_cast(task_id, instr),
            Opcode::Call => self.op_call(task_id, instr),
            Opcode::EndExcept => self.op_end_except(task_id, instr),
            Opcode::RetExcept => self.op_ret_except(task_id),
            Opcode::IterExcept => self.op_iter_except(task_id),
            Opcode::BrkExcept => self.op_brk_except(task_id),
            Opcode::Swap => self.op_swap(instr),
            Opcode::Line => self.op_line(instr),
        }
    }
}
