// Execution engine for the LHVM

use crate::codec::{string_at, LhvmFile, Snapshot};
use crate::interpreter::config::EngineConfig;
use crate::interpreter::constants::{NULL_VARIABLE_NAME, VERSION_BLACK_AND_WHITE};
use crate::interpreter::errors::{ErrorCode, FormatError};
use crate::interpreter::host::{HostCallbacks, NativeFunction};
use crate::interpreter::ops::Flow;
use crate::interpreter::task::Task;
use crate::memory::stack::Stack;
use crate::memory::value::{Value, Variable};
use crate::memory::VarRef;
use crate::program::{Instruction, Script, ScriptType};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Which operand stack `push`/`pop` address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSel {
    /// The host's stack, used outside of any task
    Main,
    Task(u32),
}

/// The virtual machine: program, globals, tasks and scheduler
pub struct Engine {
    config: EngineConfig,
    functions: Vec<NativeFunction>,
    host: Box<dyn HostCallbacks>,

    version: u32,
    variable_names: Vec<String>,
    instructions: Vec<Instruction>,
    scripts: Vec<Script>,
    autostart: Vec<u32>,
    data: Vec<u8>,

    main_stack: Stack,
    current_stack: StackSel,
    current_task: Option<u32>,

    /// Global variables; index 0 is the null variable
    variables: Vec<Variable>,
    /// Live tasks keyed by id, iterated in creation order
    tasks: BTreeMap<u32, Task>,

    ticks: u32,
    current_line: u32,
    highest_task_id: u32,
    highest_script_id: u32,
    executed_instructions: u32,
}

impl Engine {
    /// Create an engine bound to a native function table and a host
    pub fn new(
        functions: Vec<NativeFunction>,
        host: impl HostCallbacks + 'static,
        config: EngineConfig,
    ) -> Self {
        Engine {
            config,
            functions,
            host: Box::new(host),
            version: VERSION_BLACK_AND_WHITE,
            variable_names: Vec::new(),
            instructions: Vec::new(),
            scripts: Vec::new(),
            autostart: Vec::new(),
            data: Vec::new(),
            main_stack: Stack::new(),
            current_stack: StackSel::Main,
            current_task: None,
            variables: Vec::new(),
            tasks: BTreeMap::new(),
            ticks: 0,
            current_line: 0,
            highest_task_id: 0,
            highest_script_id: 0,
            executed_instructions: 0,
        }
    }

    // ------------------------------------------------------------------
    // Loading and saving
    // ------------------------------------------------------------------

    /// Load a compiled program from disk and start its autostart scripts
    pub fn load_binary(&mut self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let file = LhvmFile::open(path)?;
        self.load_file(&file)
    }

    pub fn load_binary_bytes(&mut self, bytes: &[u8]) -> Result<(), FormatError> {
        let file = LhvmFile::from_bytes(bytes)?;
        self.load_file(&file)
    }

    /// Replace the engine state with `file`'s program. Any runtime status in
    /// the file is ignored; autostart scripts are started in list order.
    pub fn load_file(&mut self, file: &LhvmFile) -> Result<(), FormatError> {
        self.reboot();
        self.install_program(file);

        self.variables = std::iter::once(Variable::new(NULL_VARIABLE_NAME))
            .chain(file.variable_names.iter().map(Variable::new))
            .collect();

        info!(
            instructions = self.instructions.len(),
            scripts = self.scripts.len(),
            globals = self.variable_names.len(),
            "program loaded"
        );

        for script_id in self.autostart.clone() {
            self.start_script(script_id);
        }
        Ok(())
    }

    /// Restore a save file: program plus the runtime status appended to it
    pub fn restore_state(&mut self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let file = LhvmFile::open(path)?;
        self.restore_file(&file)
    }

    pub fn restore_state_bytes(&mut self, bytes: &[u8]) -> Result<(), FormatError> {
        let file = LhvmFile::from_bytes(bytes)?;
        self.restore_file(&file)
    }

    /// Replace the engine state with a program and its runtime status.
    /// Autostart scripts are not run; the saved tasks already reflect them.
    pub fn restore_file(&mut self, file: &LhvmFile) -> Result<(), FormatError> {
        let status = file.status.as_ref().ok_or(FormatError::MissingStatus)?;

        self.reboot();
        self.install_program(file);

        self.main_stack = status.stack.clone();
        self.variables = std::iter::once(Variable::new(NULL_VARIABLE_NAME))
            .chain(status.variable_values.iter().cloned())
            .collect();
        self.tasks = status
            .tasks
            .iter()
            .map(|task| (task.id, task.clone()))
            .collect();
        self.ticks = status.ticks;
        self.current_line = status.current_line;
        self.highest_task_id = status.highest_task_id;
        self.highest_script_id = status.highest_script_id;
        self.executed_instructions = status.executed_instructions;

        info!(
            tasks = self.tasks.len(),
            ticks = self.ticks,
            "runtime state restored"
        );
        Ok(())
    }

    fn install_program(&mut self, file: &LhvmFile) {
        self.version = file.version;
        self.variable_names = file.variable_names.clone();
        self.instructions = file.instructions.clone();
        self.scripts = file.scripts.clone();
        self.autostart = file.autostart.clone();
        self.data = file.data.clone();
        self.highest_script_id = self
            .scripts
            .iter()
            .map(|script| script.script_id)
            .max()
            .unwrap_or(0);
    }

    /// Mirror the engine into an [`LhvmFile`], with or without runtime status
    pub fn to_file(&self, include_status: bool) -> LhvmFile {
        let status = include_status.then(|| Snapshot {
            stack: self.main_stack.clone(),
            variable_values: self.variables.iter().skip(1).cloned().collect(),
            tasks: self.tasks.values().cloned().collect(),
            ticks: self.ticks,
            current_line: self.current_line,
            highest_task_id: self.highest_task_id,
            highest_script_id: self.highest_script_id,
            executed_instructions: self.executed_instructions,
        });

        LhvmFile {
            version: self.version,
            variable_names: self.variable_names.clone(),
            instructions: self.instructions.clone(),
            autostart: self.autostart.clone(),
            scripts: self.scripts.clone(),
            data: self.data.clone(),
            status,
        }
    }

    /// Write the program only
    pub fn save_binary(&self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let path = path.as_ref();
        self.to_file(false).write(path)?;
        info!(path = %path.display(), "program saved");
        Ok(())
    }

    /// Write the program followed by the current runtime status
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let path = path.as_ref();
        self.to_file(true).write(path)?;
        info!(path = %path.display(), tasks = self.tasks.len(), "state saved");
        Ok(())
    }

    pub fn save_state_bytes(&self) -> Result<Vec<u8>, FormatError> {
        self.to_file(true).to_bytes()
    }

    /// Drop the program and every piece of runtime state
    pub fn reboot(&mut self) {
        self.variable_names.clear();
        self.instructions.clear();
        self.scripts.clear();
        self.autostart.clear();
        self.data.clear();
        self.main_stack.clear();
        self.current_stack = StackSel::Main;
        self.current_task = None;
        self.variables.clear();
        self.tasks.clear();
        self.ticks = 0;
        self.current_line = 0;
        self.highest_task_id = 0;
        self.highest_script_id = 0;
        self.executed_instructions = 0;
        info!("engine rebooted");
    }

    // ------------------------------------------------------------------
    // Host <-> script value exchange
    // ------------------------------------------------------------------

    pub(crate) fn current_stack_mut(&mut self) -> Option<&mut Stack> {
        match self.current_stack {
            StackSel::Main => Some(&mut self.main_stack),
            StackSel::Task(id) => self.tasks.get_mut(&id).map(|task| &mut task.stack),
        }
    }

    /// The stack `push`/`pop` currently address
    pub fn current_stack(&self) -> Option<&Stack> {
        match self.current_stack {
            StackSel::Main => Some(&self.main_stack),
            StackSel::Task(id) => self.tasks.get(&id).map(|task| &task.stack),
        }
    }

    /// Push onto the current stack. A full stack drops the value.
    pub fn push(&mut self, value: Value) {
        let result = match self.current_stack_mut() {
            Some(stack) => stack.push(value),
            None => return self.lost_stack(),
        };
        if let Err(code) = result {
            self.signal(code, "", 0);
        }
    }

    /// Pop from the current stack. An empty stack yields `Int 0`.
    pub fn pop(&mut self) -> Value {
        let result = match self.current_stack_mut() {
            Some(stack) => stack.pop(),
            None => {
                self.lost_stack();
                return Value::ZERO;
            }
        };
        result.unwrap_or_else(|code| {
            self.signal(code, "", 0);
            Value::ZERO
        })
    }

    /// The selected task was removed while its stack was current
    fn lost_stack(&mut self) {
        let id = match self.current_stack {
            StackSel::Task(id) => id,
            StackSel::Main => 0,
        };
        self.signal(ErrorCode::TaskIdNotFound, "", id);
    }

    pub fn push_float(&mut self, value: f32) {
        self.push(Value::Float(value));
    }

    /// Push a vector as three Float components, x first
    pub fn push_vector(&mut self, x: f32, y: f32, z: f32) {
        self.push(Value::Float(x));
        self.push(Value::Float(y));
        self.push(Value::Float(z));
    }

    pub fn push_int(&mut self, value: i32) {
        self.push(Value::Int(value));
    }

    pub fn push_object(&mut self, id: u32) {
        self.push(Value::Object(id));
    }

    pub fn push_bool(&mut self, value: bool) {
        self.push(Value::bool(value));
    }

    pub fn pop_float(&mut self) -> f32 {
        self.pop().as_float()
    }

    pub fn pop_int(&mut self) -> i32 {
        self.pop().as_int()
    }

    pub fn pop_object(&mut self) -> u32 {
        self.pop().as_object()
    }

    pub fn pop_bool(&mut self) -> bool {
        self.pop().is_truthy()
    }

    /// Pop three components pushed x, y, z
    pub fn pop_vector(&mut self) -> [f32; 3] {
        let z = self.pop_float();
        let y = self.pop_float();
        let x = self.pop_float();
        [x, y, z]
    }

    // ------------------------------------------------------------------
    // Scheduler
    // ------------------------------------------------------------------

    /// Next live task id strictly above `after`
    fn next_task_after(&self, after: Option<u32>) -> Option<u32> {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        self.tasks
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(id, _)| *id)
    }

    /// Run one tick for every task whose script type matches `mask`
    pub fn look_in(&mut self, mask: ScriptType) {
        debug!(tick = self.ticks, tasks = self.tasks.len(), "look in");

        // Exception handlers first
        let mut cursor = None;
        while let Some(id) = self.next_task_after(cursor) {
            cursor = Some(id);
            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };
            if !task.matches(mask) {
                continue;
            }
            if task.in_exception_handler {
                self.cpu_loop(id);
            } else if !task.is_waiting() && !task.exception_handlers.is_empty() {
                let last = task.exception_handlers.len() - 1;
                task.prev_instruction_address = task.instruction_address;
                task.current_exception_handler_index = last as u32;
                task.instruction_address = task.exception_handlers[last];
                task.in_exception_handler = true;
                self.cpu_loop(id);
            }
        }

        // Normal flow
        let mut cursor = None;
        while let Some(id) = self.next_task_after(cursor) {
            cursor = Some(id);
            let runnable = self.tasks.get(&id).is_some_and(|task| {
                task.matches(mask) && !task.in_exception_handler && !task.is_waiting()
            });
            if runnable {
                self.cpu_loop(id);
            }
        }

        // Reap
        let stopped: Vec<u32> = self
            .tasks
            .values()
            .filter(|task| task.stop)
            .map(|task| task.id)
            .collect();
        for id in stopped {
            self.teardown_task(id);
        }

        // Unblock
        let finished: Vec<u32> = self
            .tasks
            .values_mut()
            .filter(|task| task.matches(mask))
            .filter_map(|task| {
                task.ticks = task.ticks.wrapping_add(1);
                task.is_waiting().then_some(task.id)
            })
            .collect();
        for id in finished {
            let waiting_on = self.tasks.get(&id).map_or(0, |task| task.waiting_task_id);
            if self.tasks.contains_key(&waiting_on) {
                continue;
            }
            if let Some(task) = self.tasks.get_mut(&id) {
                debug!(task = id, callee = waiting_on, "wait finished");
                task.waiting_task_id = 0;
                task.instruction_address = task.instruction_address.wrapping_add(1);
            }
        }

        self.ticks = self.ticks.wrapping_add(1);
    }

    /// Execute `task_id` until it stops, yields, blocks or enters/leaves a handler
    fn cpu_loop(&mut self, task_id: u32) {
        let saved = (self.current_stack, self.current_task);
        self.current_stack = StackSel::Task(task_id);
        self.current_task = Some(task_id);

        let in_handler = match self.tasks.get_mut(&task_id) {
            Some(task) => {
                task.yield_requested = false;
                task.in_exception_handler
            }
            None => return,
        };

        while let Some(task) = self.tasks.get(&task_id) {
            if task.stop
                || task.yield_requested
                || task.is_waiting()
                || task.in_exception_handler != in_handler
            {
                break;
            }

            let ip = task.instruction_address;
            let Some(instr) = self.instructions.get(ip as usize).copied() else {
                let name = task.name.clone();
                self.signal(ErrorCode::InvalidOperand, &name, ip);
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    task.stop = true;
                }
                break;
            };

            if self.config.trace_instructions {
                trace!(
                    task = task_id,
                    ip,
                    line = instr.line,
                    "{}",
                    crate::disasm::mnemonic(&instr)
                );
            }
            self.executed_instructions = self.executed_instructions.wrapping_add(1);

            if let Flow::Next = self.execute(task_id, &instr) {
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    task.instruction_address = task.instruction_address.wrapping_add(1);
                }
            }
        }

        (self.current_stack, self.current_task) = saved;
    }

    // ------------------------------------------------------------------
    // Task management
    // ------------------------------------------------------------------

    /// Script by its 1-based id
    pub fn script(&self, script_id: u32) -> Option<&Script> {
        script_id
            .checked_sub(1)
            .and_then(|index| self.scripts.get(index as usize))
    }

    /// Start the script with `script_id`. Returns the new task id, or 0.
    pub fn start_script(&mut self, script_id: u32) -> u32 {
        match self.script(script_id).cloned() {
            Some(script) => self.spawn_task(&script),
            None => {
                self.signal(ErrorCode::ScriptIdNotFound, "", script_id);
                0
            }
        }
    }

    /// Start the script called `name` if its type matches `mask`. Returns the
    /// new task id, or 0.
    pub fn start_script_by_name(&mut self, name: &str, mask: ScriptType) -> u32 {
        let Some(script) = self.scripts.iter().find(|s| s.name == name).cloned() else {
            self.signal(ErrorCode::ScriptNameNotFound, name, 0);
            return 0;
        };
        if !script.script_type.matches(mask) {
            self.signal(ErrorCode::NoScriptOfType, name, mask.0);
            return 0;
        }
        self.spawn_task(&script)
    }

    fn spawn_task(&mut self, script: &Script) -> u32 {
        self.highest_task_id = self.highest_task_id.wrapping_add(1);
        let id = self.highest_task_id;
        let mut task = Task::new(id, script);

        // Parameters leave the caller's stack and keep their order
        let mut params: Vec<Value> = (0..script.parameter_count).map(|_| self.pop()).collect();
        params.reverse();
        for value in params {
            if let Err(code) = task.stack.push(value) {
                self.signal(code, &script.name, id);
            }
        }

        debug!(
            task = id,
            script = %script.name,
            params = script.parameter_count,
            "task started"
        );
        self.tasks.insert(id, task);
        id
    }

    /// Remove a task immediately, releasing its object references
    pub fn stop_task(&mut self, task_id: u32) {
        if !self.teardown_task(task_id) {
            self.signal(ErrorCode::TaskIdNotFound, "", task_id);
        }
    }

    fn teardown_task(&mut self, task_id: u32) -> bool {
        let Some(task) = self.tasks.remove(&task_id) else {
            return false;
        };
        for object in task.held_objects() {
            self.host.remove_reference(object);
        }
        self.host.stop_task(task_id);
        debug!(task = task_id, script = %task.name, "task stopped");
        true
    }

    pub fn stop_all_tasks(&mut self) {
        let ids: Vec<u32> = self.tasks.keys().copied().collect();
        for id in ids {
            self.stop_task(id);
        }
    }

    /// Stop every task whose script type shares a bit with `mask`
    pub fn stop_tasks_of_type(&mut self, mask: ScriptType) {
        let ids: Vec<u32> = self
            .tasks
            .values()
            .filter(|task| task.matches(mask))
            .map(|task| task.id)
            .collect();
        for id in ids {
            self.stop_task(id);
        }
    }

    /// Stop every task for which `filter(name, filename)` holds
    pub fn stop_scripts(&mut self, mut filter: impl FnMut(&str, &str) -> bool) {
        let ids: Vec<u32> = self
            .tasks
            .values()
            .filter(|task| filter(&task.name, &task.filename))
            .map(|task| task.id)
            .collect();
        for id in ids {
            self.stop_task(id);
        }
    }

    // ------------------------------------------------------------------
    // Helpers shared by the opcode implementations
    // ------------------------------------------------------------------

    /// Report a runtime fault to the host
    pub(crate) fn signal(&mut self, code: ErrorCode, text: &str, number: u32) {
        warn!(code = code.code(), text, number, "{}", code);
        self.host.error(code, text, number);
    }

    pub(crate) fn host_mut(&mut self) -> &mut dyn HostCallbacks {
        self.host.as_mut()
    }

    pub(crate) fn task_mut(&mut self, task_id: u32) -> Option<&mut Task> {
        self.tasks.get_mut(&task_id)
    }

    pub(crate) fn set_current_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub(crate) fn native(&self, id: u32) -> Option<&NativeFunction> {
        self.functions.get(id as usize)
    }

    fn variable_mut(&mut self, task_id: u32, id: u32) -> Option<&mut Variable> {
        let task = self.tasks.get_mut(&task_id)?;
        match task.var_ref(id) {
            VarRef::Global(index) => self.variables.get_mut(index),
            VarRef::Local(index) => task.locals.get_mut(index),
        }
    }

    /// Read a variable as seen from `task_id`. Unknown ids read as `Float 0`.
    pub(crate) fn read_variable(&mut self, task_id: u32, id: u32) -> Value {
        match self.variable_mut(task_id, id) {
            Some(var) => var.value,
            None => {
                self.signal(ErrorCode::InvalidOperand, "", id);
                Value::default()
            }
        }
    }

    /// Store into a variable, keeping host object references balanced.
    /// Returns false when the id addresses nothing.
    pub(crate) fn write_variable(&mut self, task_id: u32, id: u32, value: Value) -> bool {
        let Some(var) = self.variable_mut(task_id, id) else {
            self.signal(ErrorCode::InvalidOperand, "", id);
            return false;
        };
        let old = std::mem::replace(&mut var.value, value);
        if let Some(object) = value.object_id() {
            self.host.add_reference(object);
        }
        if let Some(object) = old.object_id() {
            self.host.remove_reference(object);
        }
        true
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn functions(&self) -> &[NativeFunction] {
        &self.functions
    }

    /// Global variable names as loaded, excluding the null variable
    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// Global variables, including the null variable at index 0
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn autostart(&self) -> &[u32] {
        &self.autostart
    }

    pub fn tasks(&self) -> &BTreeMap<u32, Task> {
        &self.tasks
    }

    pub fn task(&self, task_id: u32) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// NUL-terminated string at `offset` in the data pool (empty if out of range)
    pub fn get_string(&self, offset: u32) -> String {
        string_at(&self.data, offset).unwrap_or_default()
    }

    pub fn main_stack(&self) -> &Stack {
        &self.main_stack
    }

    /// Task being executed, for native functions that need their caller
    pub fn current_task_id(&self) -> Option<u32> {
        self.current_task
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    pub fn highest_task_id(&self) -> u32 {
        self.highest_task_id
    }

    pub fn highest_script_id(&self) -> u32 {
        self.highest_script_id
    }

    pub fn executed_instructions(&self) -> u32 {
        self.executed_instructions
    }
}
