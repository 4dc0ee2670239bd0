//! LHVM execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: The [`Engine`](engine::Engine): program state, scheduler, task management
//! - [`ops`]: Opcode semantics, one `impl Engine` block per family
//! - [`task`]: Running script instances
//! - [`host`]: Host callbacks and the native function table
//! - [`errors`]: Runtime fault codes and fatal format errors
//! - [`config`]: Engine tunables
//! - [`constants`]: File-format and runtime constants
//!
//! # Execution Model
//!
//! Tasks are cooperative. [`Engine::look_in`](engine::Engine::look_in) gives
//! every eligible task one turn per tick; a task runs instruction after
//! instruction until it yields at a loop edge, blocks on another task, ends,
//! or enters/leaves an exception handler.
//!
//! Runtime faults never abort execution. They are reported to the host with an
//! [`ErrorCode`](errors::ErrorCode) and replaced by a safe default value.

pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod host;
pub mod ops;
pub mod task;
