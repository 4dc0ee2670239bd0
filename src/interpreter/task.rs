//! Running script instances

use crate::memory::stack::Stack;
use crate::memory::value::{Value, Variable};
use crate::memory::VarRef;
use crate::program::{Script, ScriptType};

/// One running instance of a [`Script`]
///
/// A task owns its operand stack, its local variables and its exception
/// handler stack. The engine reaches it only through its id, so removing a
/// task mid-tick never leaves a dangling reference behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u32,
    pub script_id: u32,
    pub name: String,
    pub filename: String,
    pub script_type: ScriptType,

    pub instruction_address: u32,
    /// Normal-flow address saved while an exception handler runs
    pub prev_instruction_address: u32,
    /// Task this one is blocked on (0 = not waiting)
    pub waiting_task_id: u32,
    pub variables_offset: u32,
    pub locals: Vec<Variable>,
    pub stack: Stack,

    /// Registered handler addresses, most recent last
    pub exception_handlers: Vec<u32>,
    /// Handler being dispatched while `in_exception_handler` is set
    pub current_exception_handler_index: u32,

    pub ticks: u32,
    pub in_exception_handler: bool,
    pub stop: bool,
    pub yield_requested: bool,
    pub sleeping: bool,
}

impl Task {
    /// A fresh task positioned at the script's entry point
    pub fn new(id: u32, script: &Script) -> Self {
        Task {
            id,
            script_id: script.script_id,
            name: script.name.clone(),
            filename: script.filename.clone(),
            script_type: script.script_type,
            instruction_address: script.instruction_address,
            prev_instruction_address: 0,
            waiting_task_id: 0,
            variables_offset: script.variables_offset,
            locals: script.variables.iter().map(Variable::new).collect(),
            stack: Stack::new(),
            exception_handlers: Vec::new(),
            current_exception_handler_index: 0,
            ticks: 0,
            in_exception_handler: false,
            stop: false,
            yield_requested: false,
            sleeping: false,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting_task_id != 0
    }

    pub fn matches(&self, mask: ScriptType) -> bool {
        self.script_type.matches(mask)
    }

    /// Handler address currently being dispatched
    pub fn current_exception_handler(&self) -> Option<u32> {
        self.exception_handlers
            .get(self.current_exception_handler_index as usize)
            .copied()
    }

    /// Classify a variable id against this task's local offset
    pub fn var_ref(&self, id: u32) -> VarRef {
        VarRef::resolve(id, self.variables_offset)
    }

    /// Object ids still held by locals, released when the task is torn down
    pub fn held_objects(&self) -> impl Iterator<Item = u32> + '_ {
        self.locals.iter().filter_map(|var| var.value.object_id())
    }

    /// Short status word for the viewer and dumps
    pub fn state_name(&self) -> &'static str {
        if self.stop {
            "stopped"
        } else if self.is_waiting() {
            "waiting"
        } else if self.in_exception_handler {
            "in handler"
        } else if self.sleeping {
            "sleeping"
        } else {
            "runnable"
        }
    }

    pub fn local(&self, index: usize) -> Option<&Value> {
        self.locals.get(index).map(|var| &var.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Script {
        Script {
            name: "Intro".into(),
            filename: "intro.txt".into(),
            script_type: ScriptType::SCRIPT,
            variables_offset: 4,
            variables: vec!["who".into(), "count".into()],
            instruction_address: 12,
            parameter_count: 1,
            script_id: 3,
        }
    }

    #[test]
    fn new_task_starts_at_entry_with_zeroed_locals() {
        let task = Task::new(9, &script());
        assert_eq!(task.instruction_address, 12);
        assert_eq!(task.script_id, 3);
        assert_eq!(task.locals.len(), 2);
        assert!(task.locals.iter().all(|v| v.value == Value::Float(0.0)));
        assert_eq!(task.state_name(), "runnable");
    }

    #[test]
    fn held_objects_lists_object_locals() {
        let mut task = Task::new(1, &script());
        task.locals[1].value = Value::Object(77);
        assert_eq!(task.held_objects().collect::<Vec<_>>(), vec![77]);
        assert_eq!(task.var_ref(5), VarRef::Local(0));
    }
}
