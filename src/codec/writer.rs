use super::{LhvmFile, Snapshot};
use crate::interpreter::constants::MAGIC;
use crate::interpreter::errors::FormatError;
use crate::interpreter::task::Task;
use crate::memory::stack::Stack;
use crate::memory::value::Variable;
use crate::program::Script;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

type Result<T = ()> = std::result::Result<T, FormatError>;

pub(super) fn write_file<W: Write>(file: &LhvmFile, out: &mut W) -> Result {
    out.write_all(&MAGIC)?;
    out.write_u32::<LittleEndian>(file.version)?;

    write_names(out, &file.variable_names)?;

    write_count(out, file.instructions.len())?;
    for instr in &file.instructions {
        out.write_u32::<LittleEndian>(instr.opcode as u32)?;
        out.write_u32::<LittleEndian>(instr.mode.0)?;
        out.write_u32::<LittleEndian>(instr.data_type as u32)?;
        out.write_u32::<LittleEndian>(instr.operand)?;
        out.write_u32::<LittleEndian>(instr.line)?;
    }

    write_count(out, file.autostart.len())?;
    for id in &file.autostart {
        out.write_u32::<LittleEndian>(*id)?;
    }

    write_count(out, file.scripts.len())?;
    for script in &file.scripts {
        write_script(out, script)?;
    }

    write_count(out, file.data.len())?;
    out.write_all(&file.data)?;

    if let Some(status) = &file.status {
        write_snapshot(out, status)?;
    }
    Ok(())
}

fn write_count<W: Write>(out: &mut W, len: usize) -> Result {
    out.write_u32::<LittleEndian>(len as u32)?;
    Ok(())
}

fn write_string<W: Write>(out: &mut W, s: &str) -> Result {
    out.write_all(s.as_bytes())?;
    out.write_u8(0)?;
    Ok(())
}

fn write_names<W: Write>(out: &mut W, names: &[String]) -> Result {
    write_count(out, names.len())?;
    for name in names {
        write_string(out, name)?;
    }
    Ok(())
}

fn write_script<W: Write>(out: &mut W, script: &Script) -> Result {
    write_string(out, &script.name)?;
    write_string(out, &script.filename)?;
    out.write_u32::<LittleEndian>(script.script_type.0)?;
    out.write_u32::<LittleEndian>(script.variables_offset)?;
    write_names(out, &script.variables)?;
    out.write_u32::<LittleEndian>(script.instruction_address)?;
    out.write_u32::<LittleEndian>(script.parameter_count)?;
    out.write_u32::<LittleEndian>(script.script_id)?;
    Ok(())
}

fn write_snapshot<W: Write>(out: &mut W, status: &Snapshot) -> Result {
    write_stack(out, &status.stack)?;
    write_variable_values(out, &status.variable_values)?;

    write_count(out, status.tasks.len())?;
    for task in &status.tasks {
        write_task(out, task)?;
    }

    out.write_u32::<LittleEndian>(status.ticks)?;
    out.write_u32::<LittleEndian>(status.current_line)?;
    out.write_u32::<LittleEndian>(status.highest_task_id)?;
    out.write_u32::<LittleEndian>(status.highest_script_id)?;
    out.write_u32::<LittleEndian>(status.executed_instructions)?;
    Ok(())
}

fn write_stack<W: Write>(out: &mut W, stack: &Stack) -> Result {
    write_count(out, stack.count())?;
    out.write_u32::<LittleEndian>(stack.push_count)?;
    out.write_u32::<LittleEndian>(stack.pop_count)?;
    for value in stack.values() {
        out.write_u32::<LittleEndian>(value.bits())?;
    }
    for value in stack.values() {
        out.write_u32::<LittleEndian>(value.data_type() as u32)?;
    }
    Ok(())
}

fn write_variable_values<W: Write>(out: &mut W, vars: &[Variable]) -> Result {
    write_count(out, vars.len())?;
    for var in vars {
        out.write_u8(var.data_type() as u8)?;
        out.write_u32::<LittleEndian>(var.value.bits())?;
        write_string(out, &var.name)?;
    }
    Ok(())
}

fn write_task<W: Write>(out: &mut W, task: &Task) -> Result {
    write_variable_values(out, &task.locals)?;
    out.write_u32::<LittleEndian>(task.id)?;
    out.write_u32::<LittleEndian>(task.instruction_address)?;
    out.write_u32::<LittleEndian>(task.prev_instruction_address)?;
    out.write_u32::<LittleEndian>(task.waiting_task_id)?;
    out.write_u32::<LittleEndian>(task.variables_offset)?;
    out.write_u32::<LittleEndian>(task.current_exception_handler_index)?;
    out.write_u32::<LittleEndian>(task.ticks)?;
    out.write_u32::<LittleEndian>(task.script_id)?;
    out.write_u32::<LittleEndian>(task.script_type.0)?;
    out.write_u8(task.in_exception_handler as u8)?;
    out.write_u8(task.stop as u8)?;
    out.write_u8(task.yield_requested as u8)?;
    out.write_u8(task.sleeping as u8)?;
    write_stack(out, &task.stack)?;

    write_count(out, task.exception_handlers.len())?;
    for addr in &task.exception_handlers {
        out.write_u32::<LittleEndian>(*addr)?;
    }
    Ok(())
}
