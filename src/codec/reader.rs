use super::{LhvmFile, Snapshot};
use crate::interpreter::constants::{MAGIC, STACK_SIZE, VERSION_BLACK_AND_WHITE};
use crate::interpreter::errors::FormatError;
use crate::interpreter::task::Task;
use crate::memory::stack::Stack;
use crate::memory::value::{DataType, Value, Variable};
use crate::program::{Instruction, Mode, Opcode, Script, ScriptType};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

pub(super) struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub(super) fn new(bytes: &'a [u8]) -> Self {
        Reader {
            cursor: Cursor::new(bytes),
        }
    }

    pub(super) fn read_file(mut self) -> Result<LhvmFile, FormatError> {
        let mut magic = [0u8; 4];
        self.cursor
            .read_exact(&mut magic)
            .map_err(|e| FormatError::from_read(e, "header"))?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let version = self.u32("version")?;
        if version != VERSION_BLACK_AND_WHITE {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let variable_names = self.names("global variable names")?;
        let instructions = self.code()?;
        let autostart = self.autostart()?;
        let scripts = self.scripts()?;
        let data = self.data()?;

        let status = if self.remaining() == 0 {
            None
        } else {
            Some(self.snapshot(&scripts)?)
        };
        if self.remaining() > 0 {
            return Err(FormatError::TrailingBytes(self.remaining()));
        }

        Ok(LhvmFile {
            version,
            variable_names,
            instructions,
            autostart,
            scripts,
            data,
            status,
        })
    }

    fn remaining(&self) -> usize {
        self.cursor
            .get_ref()
            .len()
            .saturating_sub(self.cursor.position() as usize)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, FormatError> {
        self.cursor
            .read_u8()
            .map_err(|e| FormatError::from_read(e, what))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| FormatError::from_read(e, what))
    }

    /// Signed table count; zero or negative means an empty table
    fn count(&mut self, what: &'static str) -> Result<usize, FormatError> {
        let count = self
            .cursor
            .read_i32::<LittleEndian>()
            .map_err(|e| FormatError::from_read(e, what))?;
        Ok(count.max(0) as usize)
    }

    fn string(&mut self, what: &'static str) -> Result<String, FormatError> {
        let mut bytes = Vec::new();
        loop {
            match self.u8(what)? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn names(&mut self, what: &'static str) -> Result<Vec<String>, FormatError> {
        let count = self.count(what)?;
        (0..count).map(|_| self.string(what)).collect()
    }

    fn data_type(&mut self, raw: u32) -> Result<DataType, FormatError> {
        DataType::from_u32(raw).ok_or(FormatError::InvalidDataType(raw))
    }

    fn code(&mut self) -> Result<Vec<Instruction>, FormatError> {
        let count = self.count("code count")?;
        let mut instructions = Vec::new();
        for index in 0..count {
            let raw_opcode = self.u32("instruction")?;
            let mode = Mode(self.u32("instruction")?);
            let raw_type = self.u32("instruction")?;
            let operand = self.u32("instruction")?;
            let line = self.u32("instruction")?;

            let opcode = Opcode::from_u32(raw_opcode).ok_or(FormatError::InvalidOpcode {
                opcode: raw_opcode,
                index,
            })?;
            let data_type = self.data_type(raw_type)?;
            instructions.push(Instruction {
                opcode,
                mode,
                data_type,
                operand,
                line,
            });
        }
        Ok(instructions)
    }

    fn autostart(&mut self) -> Result<Vec<u32>, FormatError> {
        let count = self.count("autostart count")?;
        (0..count).map(|_| self.u32("autostart id")).collect()
    }

    fn scripts(&mut self) -> Result<Vec<Script>, FormatError> {
        let count = self.count("script count")?;
        (0..count).map(|_| self.script()).collect()
    }

    fn script(&mut self) -> Result<Script, FormatError> {
        let name = self.string("script name")?;
        let filename = self.string("script filename")?;
        let script_type = ScriptType(self.u32("script type")?);
        let variables_offset = self.u32("script variables offset")?;
        let variables = self.names("script variables")?;
        let instruction_address = self.u32("script instruction address")?;
        let parameter_count = self.u32("script parameter count")?;
        let script_id = self.u32("script id")?;
        Ok(Script {
            name,
            filename,
            script_type,
            variables_offset,
            variables,
            instruction_address,
            parameter_count,
            script_id,
        })
    }

    fn data(&mut self) -> Result<Vec<u8>, FormatError> {
        let size = self
            .cursor
            .read_i32::<LittleEndian>()
            .map_err(|e| FormatError::from_read(e, "data size"))?;
        if size < 0 {
            return Err(FormatError::NegativeCount {
                what: "data",
                count: size,
            });
        }
        if size as usize > self.remaining() {
            return Err(FormatError::Truncated("data"));
        }
        let mut data = Vec::with_capacity(size as usize);
        (&mut self.cursor)
            .take(size as u64)
            .read_to_end(&mut data)
            .map_err(|e| FormatError::from_read(e, "data"))?;
        Ok(data)
    }

    fn snapshot(&mut self, scripts: &[Script]) -> Result<Snapshot, FormatError> {
        let stack = self.stack()?;
        let variable_values = self.variable_values("global values")?;

        let task_count = self.u32("task count")?;
        let mut tasks = Vec::new();
        for _ in 0..task_count {
            tasks.push(self.task(scripts)?);
        }

        Ok(Snapshot {
            stack,
            variable_values,
            tasks,
            ticks: self.u32("clock ticks")?,
            current_line: self.u32("current line number")?,
            highest_task_id: self.u32("highest task id")?,
            highest_script_id: self.u32("highest script id")?,
            executed_instructions: self.u32("executed instruction count")?,
        })
    }

    fn stack(&mut self) -> Result<Stack, FormatError> {
        let count = self.u32("stack count")?;
        if count as usize > STACK_SIZE {
            return Err(FormatError::StackTooLarge(count));
        }
        let push_count = self.u32("stack push count")?;
        let pop_count = self.u32("stack pop count")?;

        let mut bits = Vec::with_capacity(count as usize);
        for _ in 0..count {
            bits.push(self.u32("stack values")?);
        }
        let mut values = Vec::with_capacity(count as usize);
        for raw in bits {
            let raw_type = self.u32("stack types")?;
            values.push(Value::from_bits(self.data_type(raw_type)?, raw));
        }

        Stack::from_parts(values, push_count, pop_count)
            .map_err(|_| FormatError::StackTooLarge(count))
    }

    fn variable_values(&mut self, what: &'static str) -> Result<Vec<Variable>, FormatError> {
        let count = self.u32(what)?;
        let mut vars = Vec::new();
        for _ in 0..count {
            let raw_type = self.u8("variable type")?;
            let bits = self.u32("variable value")?;
            let name = self.string("variable name")?;
            let ty = self.data_type(raw_type as u32)?;
            vars.push(Variable::with_value(name, Value::from_bits(ty, bits)));
        }
        Ok(vars)
    }

    fn task(&mut self, scripts: &[Script]) -> Result<Task, FormatError> {
        let locals = self.variable_values("task locals")?;
        let id = self.u32("task number")?;
        let instruction_address = self.u32("task instruction address")?;
        let prev_instruction_address = self.u32("task previous instruction address")?;
        let waiting_task_id = self.u32("task waiting task")?;
        let variables_offset = self.u32("task variables offset")?;
        let current_exception_handler_index = self.u32("task exception handler index")?;
        let ticks = self.u32("task ticks")?;
        let script_id = self.u32("task script id")?;
        let script_type = ScriptType(self.u32("task type")?);
        let in_exception_handler = self.u8("task flags")? != 0;
        let stop = self.u8("task flags")? != 0;
        let yield_requested = self.u8("task flags")? != 0;
        let sleeping = self.u8("task flags")? != 0;
        let stack = self.stack()?;

        let handler_count = self.u32("task exception handler count")?;
        let mut exception_handlers = Vec::new();
        for _ in 0..handler_count {
            exception_handlers.push(self.u32("task exception handlers")?);
        }

        let script = script_id
            .checked_sub(1)
            .and_then(|index| scripts.get(index as usize))
            .ok_or(FormatError::ScriptIdOutOfRange { task: id, script_id })?;

        Ok(Task {
            id,
            script_id,
            name: script.name.clone(),
            filename: script.filename.clone(),
            script_type,
            instruction_address,
            prev_instruction_address,
            waiting_task_id,
            variables_offset,
            locals,
            stack,
            exception_handlers,
            current_exception_handler_index,
            ticks,
            in_exception_handler,
            stop,
            yield_requested,
            sleeping,
        })
    }
}
