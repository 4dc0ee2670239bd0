//! Program model: instructions and script metadata
//!
//! - [`instruction`]: [`Opcode`], [`Mode`] and the fixed-width [`Instruction`]
//! - [`script`]: [`Script`] metadata and the [`ScriptType`] mask
//!
//! Both are plain data. Loading them lives in [`crate::codec`], running them in
//! [`crate::interpreter`].

pub mod instruction;
pub mod script;

pub use instruction::{Instruction, Mode, Opcode};
pub use script::{Script, ScriptType};
