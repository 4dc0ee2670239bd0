// Program images and save files through the engine

mod common;

use common::*;
use lhvm::codec::LhvmFile;
use lhvm::interpreter::errors::FormatError;
use lhvm::interpreter::task::Task;
use lhvm::memory::value::{DataType, Value};
use lhvm::program::{Instruction, Mode, Opcode, ScriptType};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lhvm-{}-{}", std::process::id(), name))
}

/// A counter loop plus a parked callee, so saves carry locals, waits and stacks
fn busy_program() -> LhvmFile {
    program(
        &["count", "last"],
        vec![
            // Main(step)
            Instruction::pop_var(DataType::Int, 3),
            Instruction::push_var(DataType::Int, 1),
            Instruction::push_var(DataType::Int, 3),
            op(Opcode::Add, DataType::Int),
            Instruction::pop_var(DataType::Int, 1),
            int(99),
            with_operand(Opcode::Jmp, Mode::BACKWARD, 1),
            // Spinner
            Instruction::push(Value::Object(7)),
            Instruction::pop_var(DataType::Object, 2),
            with_operand(Opcode::Jmp, Mode::BACKWARD, 9),
        ],
        vec![
            script("Main", 1, 0, 2, &["step"], 1),
            script("Spinner", 2, 7, 2, &[], 0),
        ],
        vec![2],
    )
}

fn busy_engine() -> (lhvm::interpreter::engine::Engine, Recorder) {
    let (mut engine, recorder) = load(&busy_program(), vec![]);
    engine.push_int(5);
    engine.start_script(1);
    for _ in 0..3 {
        engine.look_in(ScriptType::ALL);
    }
    (engine, recorder)
}

#[test]
fn test_state_round_trip_preserves_everything() {
    let (engine, _) = busy_engine();
    assert_eq!(global(&engine, 1), Value::Int(15));

    let bytes = engine.save_state_bytes().unwrap();
    let (mut restored, _) = common::engine(vec![]);
    restored.restore_state_bytes(&bytes).unwrap();

    assert_eq!(restored.to_file(true), engine.to_file(true));
    assert_eq!(restored.ticks(), 3);
    assert_eq!(restored.highest_task_id(), 2);
    let task = restored.task(2).unwrap();
    assert_eq!(task.name, "Main");
    assert_eq!(task.stack.values().len(), 3);
}

#[test]
fn test_restored_engine_continues_identically() {
    let (mut original, _) = busy_engine();
    let bytes = original.save_state_bytes().unwrap();
    let (mut restored, _) = common::engine(vec![]);
    restored.restore_state_bytes(&bytes).unwrap();

    for _ in 0..4 {
        original.look_in(ScriptType::ALL);
        restored.look_in(ScriptType::ALL);
    }

    assert_eq!(
        restored.save_state_bytes().unwrap(),
        original.save_state_bytes().unwrap()
    );
    assert_eq!(global(&restored, 1), Value::Int(35));
    assert_eq!(restored.start_script(2), 3);
}

#[test]
fn test_restore_does_not_run_autostart() {
    let (engine, _) = load(&busy_program(), vec![]);
    let bytes = engine.save_state_bytes().unwrap();

    let (mut restored, _) = common::engine(vec![]);
    restored.restore_state_bytes(&bytes).unwrap();

    assert_eq!(restored.tasks().len(), 1);
    assert_eq!(restored.highest_task_id(), 1);
}

#[test]
fn test_binary_save_and_load() {
    let (engine, _) = busy_engine();
    let path = temp_path("program.chl");
    engine.save_binary(&path).unwrap();

    let file = LhvmFile::open(&path).unwrap();
    assert!(!file.has_status());
    assert_eq!(file.scripts, busy_program().scripts);

    let (mut loaded, _) = common::engine(vec![]);
    loaded.load_binary(&path).unwrap();
    // Autostart created a fresh Spinner; globals start over
    assert_eq!(loaded.tasks().len(), 1);
    assert_eq!(global(&loaded, 1), Value::Float(0.0));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_state_file_on_disk() {
    let (engine, _) = busy_engine();
    let path = temp_path("state.sav");
    engine.save_state(&path).unwrap();

    let (mut restored, _) = common::engine(vec![]);
    restored.restore_state(&path).unwrap();
    assert_eq!(restored.to_file(true), engine.to_file(true));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_restore_requires_status() {
    let (engine, _) = load(&busy_program(), vec![]);
    let bytes = engine.to_file(false).to_bytes().unwrap();

    let (mut restored, _) = common::engine(vec![]);
    assert!(matches!(
        restored.restore_state_bytes(&bytes),
        Err(FormatError::MissingStatus)
    ));
}

#[test]
fn test_failed_load_leaves_engine_untouched() {
    let (mut engine, _) = busy_engine();
    let before = engine.save_state_bytes().unwrap();
    let truncated = &before[..before.len() - 3];

    assert!(matches!(
        engine.restore_state_bytes(truncated),
        Err(FormatError::Truncated(_))
    ));
    assert!(matches!(
        engine.load_binary_bytes(b"LHVX\x07\0\0\0"),
        Err(FormatError::BadMagic(_))
    ));
    assert_eq!(engine.save_state_bytes().unwrap(), before);
}

#[test]
fn test_task_with_unknown_script_is_rejected() {
    let file = busy_program();
    let mut stray = Task::new(1, &file.scripts[0]);
    stray.script_id = 3;
    let (engine, _) = load(&file, vec![]);
    let mut saved = engine.to_file(true);
    if let Some(status) = saved.status.as_mut() {
        status.tasks.push(stray);
    }

    let bytes = saved.to_bytes().unwrap();
    assert!(matches!(
        LhvmFile::from_bytes(&bytes),
        Err(FormatError::ScriptIdOutOfRange { script_id: 3, .. })
    ));
}
