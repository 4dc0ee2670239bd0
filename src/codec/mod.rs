//! Program image and save-file codec
//!
//! An [`LhvmFile`] is the in-memory mirror of a compiled program (`.chl`),
//! optionally followed by a runtime [`Snapshot`] (`.sav`). Both directions are
//! lossless: writing a loaded file and reading it back yields an equal value.
//!
//! # Layout
//!
//! ```text
//! "LHVM" version
//! names:    i32 count, count × NUL-terminated string
//! code:     i32 count, count × {opcode, mode, type, operand, line}
//! auto:     i32 count, count × script id
//! scripts:  i32 count, count × {name\0 file\0 type offset names entry params id}
//! data:     i32 size, size × byte
//! --- optional runtime status ---
//! stack:    count push pop, count × value, count × type
//! globals:  u32 count, count × {u8 type, value, name\0}
//! tasks:    u32 count, count × task record
//! trailer:  ticks line highest_task highest_script executed
//! ```
//!
//! Every integer is a little-endian 32-bit field unless noted.

mod reader;
mod writer;

use crate::interpreter::constants::VERSION_BLACK_AND_WHITE;
use crate::interpreter::errors::FormatError;
use crate::interpreter::task::Task;
use crate::memory::stack::Stack;
use crate::memory::value::Variable;
use crate::program::{Instruction, Script};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Runtime status appended to a program image in save files
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// The main (host) stack
    pub stack: Stack,
    /// Values of the real globals; the null variable is not stored
    pub variable_values: Vec<Variable>,
    pub tasks: Vec<Task>,
    pub ticks: u32,
    pub current_line: u32,
    pub highest_task_id: u32,
    pub highest_script_id: u32,
    pub executed_instructions: u32,
}

/// A compiled program, with optional runtime status
#[derive(Debug, Clone, PartialEq)]
pub struct LhvmFile {
    pub version: u32,
    /// Global variable names, excluding the null variable at id 0
    pub variable_names: Vec<String>,
    pub instructions: Vec<Instruction>,
    /// Script ids started when the program is loaded
    pub autostart: Vec<u32>,
    pub scripts: Vec<Script>,
    /// String pool addressed by byte offset
    pub data: Vec<u8>,
    pub status: Option<Snapshot>,
}

impl Default for LhvmFile {
    fn default() -> Self {
        LhvmFile {
            version: VERSION_BLACK_AND_WHITE,
            variable_names: Vec::new(),
            instructions: Vec::new(),
            autostart: Vec::new(),
            scripts: Vec::new(),
            data: Vec::new(),
            status: None,
        }
    }
}

impl LhvmFile {
    /// Read a program image or save file from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        debug!(path = %path.display(), size = bytes.len(), "reading LHVM file");
        Self::from_bytes(&bytes)
    }

    /// Parse an in-memory image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        reader::Reader::new(bytes).read_file()
    }

    /// Serialize to disk, creating or truncating `path`
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let mut out = BufWriter::new(fs::File::create(path.as_ref())?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Serialize into any writer
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), FormatError> {
        writer::write_file(self, out)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn has_status(&self) -> bool {
        self.status.is_some()
    }

    /// NUL-terminated string from the data pool
    pub fn string_at(&self, offset: u32) -> Option<String> {
        string_at(&self.data, offset)
    }

    /// Script by its 1-based id
    pub fn script(&self, id: u32) -> Option<&Script> {
        id.checked_sub(1)
            .and_then(|index| self.scripts.get(index as usize))
    }
}

/// Read a NUL-terminated string starting at `offset` in a data pool
pub fn string_at(data: &[u8], offset: u32) -> Option<String> {
    let tail = data.get(offset as usize..)?;
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    Some(String::from_utf8_lossy(&tail[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::constants::MAGIC;
    use crate::memory::value::{DataType, Value};
    use crate::program::{Mode, Opcode, ScriptType};

    fn sample() -> LhvmFile {
        LhvmFile {
            variable_names: vec!["Score".into(), "Lives".into()],
            instructions: vec![
                Instruction::push(Value::Int(5)).with_line(3),
                Instruction::new(Opcode::Jmp, Mode::FORWARD, DataType::None, 2),
                Instruction::bare(Opcode::End),
            ],
            autostart: vec![1],
            scripts: vec![Script {
                name: "Main".into(),
                filename: "main.txt".into(),
                script_type: ScriptType::SCRIPT,
                variables_offset: 2,
                variables: vec!["x".into()],
                instruction_address: 0,
                parameter_count: 0,
                script_id: 1,
            }],
            data: b"hello\0world\0".to_vec(),
            ..LhvmFile::default()
        }
    }

    #[test]
    fn program_round_trips() {
        let file = sample();
        let bytes = file.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &MAGIC);
        let back = LhvmFile::from_bytes(&bytes).unwrap();
        assert_eq!(back, file);
        assert!(!back.has_status());
    }

    fn with_status() -> LhvmFile {
        let mut file = sample();
        let script = file.scripts[0].clone();
        let mut task = Task::new(4, &script);
        task.locals[0].value = Value::Object(12);
        task.stack.push(Value::Float(1.5)).unwrap();
        task.exception_handlers = vec![2, 1];
        task.sleeping = true;

        let mut stack = Stack::new();
        stack.push(Value::TRUE).unwrap();

        file.status = Some(Snapshot {
            stack,
            variable_values: vec![
                Variable::with_value("Score", Value::Int(10)),
                Variable::new("Lives"),
            ],
            tasks: vec![task],
            ticks: 40,
            current_line: 3,
            highest_task_id: 4,
            highest_script_id: 1,
            executed_instructions: 99,
        });
        file
    }

    #[test]
    fn status_round_trips() {
        let file = with_status();
        let back = LhvmFile::from_bytes(&file.to_bytes().unwrap()).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn boolean_payloads_survive_a_save() {
        let mut file = with_status();
        if let Some(status) = file.status.as_mut() {
            status.variable_values[1].value = Value::Boolean(5);
            status.stack.push(Value::Boolean(0xff)).unwrap();
        }
        let bytes = file.to_bytes().unwrap();
        let back = LhvmFile::from_bytes(&bytes).unwrap();
        assert_eq!(back.to_bytes().unwrap(), bytes);
        let status = back.status.unwrap();
        assert_eq!(status.variable_values[1].value, Value::Boolean(5));
        assert_eq!(status.stack.peek(0), Some(&Value::Boolean(0xff)));
    }

    #[test]
    fn bytes_after_the_status_are_rejected() {
        let mut bytes = with_status().to_bytes().unwrap();
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(
            LhvmFile::from_bytes(&bytes),
            Err(FormatError::TrailingBytes(2))
        ));
    }

    #[test]
    fn oversized_data_pool_is_truncated() {
        let mut bytes = MAGIC.to_vec();
        for field in [7u32, 0, 0, 0, 0, i32::MAX as u32] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes.extend_from_slice(b"hi\0");
        assert!(matches!(
            LhvmFile::from_bytes(&bytes),
            Err(FormatError::Truncated("data"))
        ));
    }

    #[test]
    fn short_stream_is_an_error() {
        let bytes = sample().to_bytes().unwrap();
        for cut in [0, 3, 7, 20, bytes.len() - 1] {
            assert!(LhvmFile::from_bytes(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn wrong_magic_and_version_are_rejected() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[4] = 12;
        assert!(matches!(
            LhvmFile::from_bytes(&bytes),
            Err(FormatError::UnsupportedVersion(12))
        ));
        bytes[0] = b'X';
        assert!(matches!(
            LhvmFile::from_bytes(&bytes),
            Err(FormatError::BadMagic(_))
        ));
    }

    #[test]
    fn strings_come_from_the_data_pool() {
        let file = sample();
        assert_eq!(file.string_at(0).as_deref(), Some("hello"));
        assert_eq!(file.string_at(6).as_deref(), Some("world"));
        assert_eq!(file.string_at(100), None);
    }
}
