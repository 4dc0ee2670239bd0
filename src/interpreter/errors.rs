//! Error types for the LHVM engine
//!
//! Errors come in two tiers:
//!
//! - [`ErrorCode`]: runtime faults raised while scripts execute. These are
//!   never fatal. The engine reports them through
//!   [`HostCallbacks::error`](super::host::HostCallbacks::error), substitutes a
//!   safe default and keeps running.
//! - [`FormatError`]: problems reading or writing a program image or save
//!   file. These abort the load/save and leave the engine untouched.

use std::io;
use thiserror::Error;

/// Recoverable runtime fault, numbered as the host expects
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    #[error("no error")]
    NoError = 0,
    #[error("stack is empty")]
    StackEmpty = 1,
    #[error("stack is full")]
    StackFull = 2,
    #[error("script id not found")]
    ScriptIdNotFound = 3,
    #[error("script name not found")]
    ScriptNameNotFound = 4,
    #[error("no script of type")]
    NoScriptOfType = 5,
    #[error("task id not found")]
    TaskIdNotFound = 6,
    #[error("native function not found")]
    NativeFuncNotFound = 7,
    #[error("division by zero")]
    DivByZero = 8,
    #[error("invalid data type")]
    InvalidType = 9,
    #[error("invalid operand")]
    InvalidOperand = 10,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Fatal load/save failure
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),

    #[error("unrecognised header, expected \"LHVM\" but found {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported LHVM version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid opcode {opcode} at instruction {index}")]
    InvalidOpcode { opcode: u32, index: usize },

    #[error("invalid data type {0}")]
    InvalidDataType(u32),

    #[error("negative {what} count {count}")]
    NegativeCount { what: &'static str, count: i32 },

    #[error("stack count {0} exceeds the 32 slot capacity")]
    StackTooLarge(u32),

    #[error("task {task} refers to unknown script {script_id}")]
    ScriptIdOutOfRange { task: u32, script_id: u32 },

    #[error("no runtime status present")]
    MissingStatus,

    #[error("{0} unexpected bytes after the runtime status")]
    TrailingBytes(usize),
}

impl FormatError {
    /// Map a byteorder/io read failure to a truncation error when the stream ran dry
    pub fn from_read(err: io::Error, what: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated(what)
        } else {
            FormatError::Io(err)
        }
    }
}
