// Shared fixtures for the integration tests

#![allow(dead_code)]

use lhvm::codec::LhvmFile;
use lhvm::interpreter::config::EngineConfig;
use lhvm::interpreter::engine::Engine;
use lhvm::interpreter::errors::ErrorCode;
use lhvm::interpreter::host::{HostCallbacks, NativeFunction};
use lhvm::memory::value::Value;
use lhvm::program::{Instruction, Mode, Opcode, Script, ScriptType};
use lhvm::memory::value::DataType;
use std::cell::RefCell;
use std::rc::Rc;

/// Everything the engine told the host
#[derive(Debug, Default)]
pub struct Log {
    pub errors: Vec<(ErrorCode, String, u32)>,
    pub stopped: Vec<u32>,
    pub added: Vec<u32>,
    pub removed: Vec<u32>,
    pub entered: Vec<u32>,
    pub exited: Vec<u32>,
}

/// Host that records every callback into a shared log
#[derive(Debug, Clone, Default)]
pub struct Recorder(pub Rc<RefCell<Log>>);

impl Recorder {
    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.0.borrow().errors.iter().map(|(code, _, _)| *code).collect()
    }

    pub fn count(&self, code: ErrorCode) -> usize {
        self.error_codes().into_iter().filter(|c| *c == code).count()
    }
}

impl HostCallbacks for Recorder {
    fn native_call_enter(&mut self, func: u32) {
        self.0.borrow_mut().entered.push(func);
    }

    fn native_call_exit(&mut self, func: u32) {
        self.0.borrow_mut().exited.push(func);
    }

    fn stop_task(&mut self, task_id: u32) {
        self.0.borrow_mut().stopped.push(task_id);
    }

    fn error(&mut self, code: ErrorCode, text: &str, number: u32) {
        self.0.borrow_mut().errors.push((code, text.to_string(), number));
    }

    fn add_reference(&mut self, object: u32) {
        self.0.borrow_mut().added.push(object);
    }

    fn remove_reference(&mut self, object: u32) {
        self.0.borrow_mut().removed.push(object);
    }
}

pub fn script(
    name: &str,
    script_id: u32,
    instruction_address: u32,
    variables_offset: u32,
    variables: &[&str],
    parameter_count: u32,
) -> Script {
    Script {
        name: name.to_string(),
        filename: format!("{}.txt", name.to_lowercase()),
        script_type: ScriptType::SCRIPT,
        variables_offset,
        variables: variables.iter().map(|v| v.to_string()).collect(),
        instruction_address,
        parameter_count,
        script_id,
    }
}

pub fn program(
    globals: &[&str],
    instructions: Vec<Instruction>,
    scripts: Vec<Script>,
    autostart: Vec<u32>,
) -> LhvmFile {
    LhvmFile {
        variable_names: globals.iter().map(|g| g.to_string()).collect(),
        instructions,
        autostart,
        scripts,
        data: b"hello\0".to_vec(),
        ..LhvmFile::default()
    }
}

pub fn engine(natives: Vec<NativeFunction>) -> (Engine, Recorder) {
    let recorder = Recorder::default();
    let engine = Engine::new(natives, recorder.clone(), EngineConfig::default());
    (engine, recorder)
}

/// Load `file` into a fresh engine with the given natives
pub fn load(file: &LhvmFile, natives: Vec<NativeFunction>) -> (Engine, Recorder) {
    let (mut engine, recorder) = engine(natives);
    engine.load_file(file).unwrap();
    (engine, recorder)
}

/// Globals `a`, `b`, `c` (ids 1..=3) and one autostarted script running `code`
pub fn single_script(code: Vec<Instruction>) -> LhvmFile {
    program(
        &["a", "b", "c"],
        code,
        vec![script("Test", 1, 0, 3, &[], 0)],
        vec![1],
    )
}

/// Run `code` for one tick in a single autostarted script
pub fn run(code: Vec<Instruction>, natives: Vec<NativeFunction>) -> (Engine, Recorder) {
    let (mut engine, recorder) = load(&single_script(code), natives);
    engine.look_in(ScriptType::ALL);
    (engine, recorder)
}

pub fn global(engine: &Engine, id: usize) -> Value {
    engine.variables()[id].value
}

pub fn int(value: i32) -> Instruction {
    Instruction::push(Value::Int(value))
}

pub fn float(value: f32) -> Instruction {
    Instruction::push(Value::Float(value))
}

pub fn op(opcode: Opcode, ty: DataType) -> Instruction {
    Instruction::typed(opcode, ty)
}

pub fn with_operand(opcode: Opcode, mode: Mode, operand: u32) -> Instruction {
    Instruction::new(opcode, mode, DataType::None, operand)
}

pub fn end() -> Instruction {
    Instruction::bare(Opcode::End)
}
