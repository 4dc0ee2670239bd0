//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`code`]: Disassembled program with the selected task's instruction pointer
//! - [`tasks`]: Live tasks in scheduling order with their state
//! - [`stack`]: Operand stack and locals of the selected task (or the main stack)
//! - [`globals`]: Global variable values
//! - [`status`]: Status bar with keybindings and tick counters
//! - `utils`: Shared block and value styling
//!
//! Each pane module exports a primary `render_*` function that borrows the
//! engine read-only; scroll and selection state lives in the app.

mod utils;

pub mod code;
pub mod globals;
pub mod stack;
pub mod status;
pub mod tasks;

pub use code::{render_code_pane, CodeScrollState};
pub use globals::render_globals_pane;
pub use stack::render_stack_pane;
pub use status::{render_status_bar, StatusRenderData};
pub use tasks::render_tasks_pane;
