//! Memory model for the VM
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Tagged runtime values ([`value::Value`]), type tags
//!   ([`value::DataType`]) and named [`value::Variable`]s
//! - [`stack`]: The fixed 32-slot operand [`stack::Stack`]
//!
//! # Variable Addressing
//!
//! Variables are addressed by a single numeric id. For a task whose script
//! has a local-variable offset `off`:
//! ```text
//! id <= off  →  globals[id]            (id 0 is the reserved null variable)
//! id >  off  →  task.locals[id - off - 1]
//! ```
//! [`VarRef::resolve`] performs this split.

pub mod stack;
pub mod value;

/// Which table a variable id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Global(usize),
    Local(usize),
}

impl VarRef {
    /// Split a variable id using the owning task's local offset
    pub fn resolve(id: u32, variables_offset: u32) -> Self {
        if id <= variables_offset {
            VarRef::Global(id as usize)
        } else {
            VarRef::Local((id - variables_offset - 1) as usize)
        }
    }
}
