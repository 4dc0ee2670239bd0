//! # Introduction
//!
//! LHVM is the cooperative bytecode virtual machine that runs compiled game
//! scripts. A program image holds global variable names, a flat instruction
//! array, a script table, autostart entries and a string data pool. The engine
//! runs scripts as tasks, gives each eligible task one turn per tick, and can
//! save its full runtime status and restore it later.
//!
//! ## Execution pipeline
//!
//! ```text
//! .chl/.sav → Codec → Engine (tasks, globals, stacks) → Save state → Viewer
//! ```
//!
//! 1. [`codec`]: reads and writes program images and save files.
//! 2. [`program`]: instructions, opcodes, modes and the script table.
//! 3. [`memory`]: tagged [`memory::value::Value`]s, named variables and the
//!    fixed-size operand [`memory::stack::Stack`].
//! 4. [`interpreter`]: the [`interpreter::engine::Engine`], its scheduler and
//!    opcode semantics, plus the [`interpreter::host::HostCallbacks`] seam.
//! 5. [`disasm`]: listings and text dumps of program images and save files.
//! 6. [`snapshot`]: per-tick history with a memory limit, used to step back.
//! 7. [`ui`]: ratatui-based viewer; not part of the stable library API.

pub mod codec;
pub mod disasm;
pub mod interpreter;
pub mod memory;
pub mod program;
pub mod snapshot;
pub mod ui;
