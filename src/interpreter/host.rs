//! Host integration: callbacks and the native function table
//!
//! The engine never talks to the game directly. Everything it needs from the
//! outside world arrives through two seams:
//!
//! - [`HostCallbacks`]: notifications (native call bracketing, task teardown,
//!   runtime faults) and reference counting for host-owned objects
//! - [`NativeFunction`]: entries of the table that `SYS` indexes into
//!
//! Every callback has a no-op default, so a host only overrides what it uses.

use super::engine::Engine;
use super::errors::ErrorCode;
use std::fmt;
use std::rc::Rc;

/// Notifications the engine sends to its embedder
pub trait HostCallbacks {
    /// A bound native function is about to run
    fn native_call_enter(&mut self, _func: u32) {}

    /// A bound native function returned
    fn native_call_exit(&mut self, _func: u32) {}

    /// A task is being removed from the task table
    fn stop_task(&mut self, _task_id: u32) {}

    /// A recoverable runtime fault. `text` and `number` carry optional detail
    /// (script name, native function name, offending id).
    fn error(&mut self, _code: ErrorCode, _text: &str, _number: u32) {}

    /// A variable started holding `object`
    fn add_reference(&mut self, _object: u32) {}

    /// A variable stopped holding `object`
    fn remove_reference(&mut self, _object: u32) {}
}

/// Host that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl HostCallbacks for NullHost {}

/// Body of a native function. It exchanges values with the script through
/// the engine's current stack.
pub type NativeImpl = Rc<dyn Fn(&mut Engine)>;

/// One entry of the native function table
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    /// Values popped from the stack
    pub stack_in: u32,
    /// Values pushed back
    pub stack_out: u32,
    pub implementation: Option<NativeImpl>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        stack_in: u32,
        stack_out: u32,
        implementation: impl Fn(&mut Engine) + 'static,
    ) -> Self {
        NativeFunction {
            name: name.into(),
            stack_in,
            stack_out,
            implementation: Some(Rc::new(implementation)),
        }
    }

    /// An entry with a known signature but no body. Calls to it only
    /// reproduce its stack effect.
    pub fn unbound(name: impl Into<String>, stack_in: u32, stack_out: u32) -> Self {
        NativeFunction {
            name: name.into(),
            stack_in,
            stack_out,
            implementation: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.implementation.is_some()
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("stack_in", &self.stack_in)
            .field("stack_out", &self.stack_out)
            .field("bound", &self.is_bound())
            .finish()
    }
}
