// Task lifecycle and tick scheduling

mod common;

use common::*;
use lhvm::interpreter::config::EngineConfig;
use lhvm::interpreter::engine::Engine;
use lhvm::interpreter::errors::ErrorCode;
use lhvm::memory::value::{DataType, Value};
use lhvm::program::{Instruction, Mode, Opcode, ScriptType};

/// `Main` calls `Child`; each writes one global and ends
fn caller_program(mode: Mode) -> lhvm::codec::LhvmFile {
    program(
        &["a", "b"],
        vec![
            // Main
            with_operand(Opcode::Call, mode, 2),
            int(1),
            Instruction::pop_var(DataType::Int, 1),
            end(),
            // Child
            int(2),
            Instruction::pop_var(DataType::Int, 2),
            end(),
        ],
        vec![script("Main", 1, 0, 2, &[], 0), script("Child", 2, 4, 2, &[], 0)],
        vec![1],
    )
}

#[test]
fn test_sync_call_waits_for_callee() {
    let (mut engine, recorder) = load(&caller_program(Mode::SYNC), vec![]);

    engine.look_in(ScriptType::ALL);

    // The callee was created mid-pass and ran in the same tick
    assert_eq!(global(&engine, 2), Value::Int(2));
    assert_eq!(global(&engine, 1), Value::Float(0.0));
    let main = engine.task(1).unwrap();
    assert_eq!(main.waiting_task_id, 0);
    assert_eq!(main.instruction_address, 1);
    assert_eq!(recorder.0.borrow().stopped, vec![2]);

    engine.look_in(ScriptType::ALL);
    assert_eq!(global(&engine, 1), Value::Int(1));
    assert!(engine.tasks().is_empty());
    assert_eq!(engine.ticks(), 2);
}

#[test]
fn test_sync_call_blocks_while_callee_loops() {
    let file = program(
        &["a", "b"],
        vec![
            // Main
            with_operand(Opcode::Call, Mode::SYNC, 2),
            int(1),
            Instruction::pop_var(DataType::Int, 1),
            end(),
            // Child spins until stopped
            int(2),
            Instruction::pop_var(DataType::Int, 2),
            with_operand(Opcode::Jmp, Mode::BACKWARD, 4),
        ],
        vec![script("Main", 1, 0, 2, &[], 0), script("Child", 2, 4, 2, &[], 0)],
        vec![1],
    );
    let (mut engine, _) = load(&file, vec![]);

    engine.look_in(ScriptType::ALL);
    let main = engine.task(1).unwrap();
    assert!(main.is_waiting());
    assert_eq!(main.waiting_task_id, 2);
    assert_eq!(main.instruction_address, 0);
    assert!(engine.task(2).is_some());
    assert_eq!(global(&engine, 2), Value::Int(2));
    assert_eq!(engine.executed_instructions(), 4);

    engine.look_in(ScriptType::ALL);
    assert_eq!(engine.task(1).map(|t| t.waiting_task_id), Some(2));
    assert_eq!(engine.executed_instructions(), 7);
    assert_eq!(global(&engine, 1), Value::Float(0.0));

    engine.stop_task(2);
    engine.look_in(ScriptType::ALL);
    assert_eq!(engine.task(1).map(|t| t.instruction_address), Some(1));
    engine.look_in(ScriptType::ALL);
    assert_eq!(global(&engine, 1), Value::Int(1));
    assert!(engine.tasks().is_empty());
}

#[test]
fn test_async_call_continues_immediately() {
    let (mut engine, _) = load(&caller_program(Mode::ASYNC), vec![]);

    engine.look_in(ScriptType::ALL);

    assert_eq!(global(&engine, 1), Value::Int(1));
    assert_eq!(global(&engine, 2), Value::Int(2));
    assert!(engine.tasks().is_empty());
}

#[test]
fn test_start_script_moves_parameters() {
    let file = program(
        &[],
        vec![end()],
        vec![script("Walk", 1, 0, 0, &["x", "y", "tmp"], 2)],
        vec![],
    );
    let (mut engine, _) = load(&file, vec![]);

    engine.push_float(1.0);
    engine.push_float(2.0);
    let first = engine.start_script(1);
    let second = engine.start_script(1);

    assert_eq!((first, second), (1, 2));
    assert_eq!(engine.highest_task_id(), 2);

    let task = engine.task(first).unwrap();
    assert_eq!(task.stack.values(), &[Value::Float(1.0), Value::Float(2.0)]);
    let names: Vec<&str> = task.locals.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y", "tmp"]);
    assert_eq!(task.name, "Walk");
    assert_eq!(task.filename, "walk.txt");
    assert!(engine.main_stack().is_empty());
}

#[test]
fn test_start_script_failures() {
    let mut help = script("Hint", 1, 0, 0, &[], 0);
    help.script_type = ScriptType::HELP;
    let file = program(&[], vec![end()], vec![help], vec![]);
    let (mut engine, recorder) = load(&file, vec![]);

    assert_eq!(engine.start_script(0), 0);
    assert_eq!(engine.start_script(2), 0);
    assert_eq!(engine.start_script_by_name("Nope", ScriptType::ALL), 0);
    assert_eq!(engine.start_script_by_name("Hint", ScriptType::SCRIPT), 0);
    assert_eq!(engine.start_script_by_name("Hint", ScriptType::HELP), 1);

    assert_eq!(
        recorder.error_codes(),
        vec![
            ErrorCode::ScriptIdNotFound,
            ErrorCode::ScriptIdNotFound,
            ErrorCode::ScriptNameNotFound,
            ErrorCode::NoScriptOfType,
        ]
    );
}

#[test]
fn test_stop_task_releases_held_objects() {
    let file = program(
        &[],
        vec![
            Instruction::push(Value::Object(42)),
            Instruction::pop_var(DataType::Object, 1),
            with_operand(Opcode::Jmp, Mode::BACKWARD, 2),
        ],
        vec![script("Holder", 1, 0, 0, &["obj"], 0)],
        vec![1],
    );
    let (mut engine, recorder) = load(&file, vec![]);

    engine.look_in(ScriptType::ALL);
    assert_eq!(engine.task(1).and_then(|t| t.local(0).copied()), Some(Value::Object(42)));
    assert_eq!(recorder.0.borrow().added, vec![42]);

    engine.stop_task(1);
    assert!(engine.tasks().is_empty());
    {
        let log = recorder.0.borrow();
        assert_eq!(log.removed, vec![42]);
        assert_eq!(log.stopped, vec![1]);
    }

    engine.stop_task(1);
    assert_eq!(recorder.error_codes(), vec![ErrorCode::TaskIdNotFound]);
}

#[test]
fn test_backward_jump_yields_once_per_tick() {
    let (mut engine, _) = load(
        &single_script(vec![
            Instruction::push_var(DataType::Int, 1),
            int(1),
            op(Opcode::Add, DataType::Int),
            Instruction::pop_var(DataType::Int, 1),
            with_operand(Opcode::Jmp, Mode::BACKWARD, 0),
        ]),
        vec![],
    );

    for _ in 0..3 {
        engine.look_in(ScriptType::ALL);
    }

    // The first read sees Float 0.0, whose bits are Int 0
    assert_eq!(global(&engine, 1), Value::Int(3));
    assert_eq!(engine.executed_instructions(), 15);
    assert_eq!(engine.ticks(), 3);
}

#[test]
fn test_sleep_counts_task_ticks() {
    let file = single_script(vec![
        float(0.25),
        Instruction::bare(Opcode::Sleep),
        with_operand(Opcode::Jz, Mode::BACKWARD, 0),
        int(1),
        Instruction::pop_var(DataType::Int, 1),
        end(),
    ]);
    let (mut engine, recorder) = engine(vec![]);
    engine.load_file(&file).unwrap();

    for _ in 0..3 {
        engine.look_in(ScriptType::ALL);
    }
    assert_eq!(global(&engine, 1), Value::Float(0.0));
    assert!(engine.task(1).is_some_and(|t| t.sleeping));

    engine.look_in(ScriptType::ALL);
    assert_eq!(global(&engine, 1), Value::Int(1));
    assert!(engine.tasks().is_empty());
    assert!(recorder.error_codes().is_empty());
}

#[test]
fn test_tick_duration_is_configurable() {
    let file = single_script(vec![
        float(0.25),
        Instruction::bare(Opcode::Sleep),
        with_operand(Opcode::Jz, Mode::BACKWARD, 0),
        end(),
    ]);
    let mut engine = Engine::new(
        vec![],
        Recorder::default(),
        EngineConfig::default().with_tick_duration(1.0),
    );
    engine.load_file(&file).unwrap();

    engine.look_in(ScriptType::ALL);
    assert_eq!(engine.tasks().len(), 1);
    engine.look_in(ScriptType::ALL);
    assert!(engine.tasks().is_empty());
}

#[test]
fn test_autostart_runs_in_list_order() {
    let file = program(
        &[],
        vec![end(), end()],
        vec![script("First", 1, 0, 0, &[], 0), script("Second", 2, 1, 0, &[], 0)],
        vec![2, 1],
    );
    let (engine, _) = load(&file, vec![]);

    let names: Vec<(u32, &str)> = engine
        .tasks()
        .values()
        .map(|t| (t.id, t.name.as_str()))
        .collect();
    assert_eq!(names, vec![(1, "Second"), (2, "First")]);
    assert_eq!(engine.highest_script_id(), 2);
    assert_eq!(engine.ticks(), 0);
}

#[test]
fn test_mask_selects_script_types() {
    let mut help = script("Help", 2, 3, 2, &[], 0);
    help.script_type = ScriptType::HELP;
    let file = program(
        &["a", "b"],
        vec![
            int(1),
            Instruction::pop_var(DataType::Int, 1),
            end(),
            int(2),
            Instruction::pop_var(DataType::Int, 2),
            end(),
        ],
        vec![script("Main", 1, 0, 2, &[], 0), help],
        vec![1, 2],
    );
    let (mut engine, _) = load(&file, vec![]);

    engine.look_in(ScriptType::HELP);

    assert_eq!(global(&engine, 1), Value::Float(0.0));
    assert_eq!(global(&engine, 2), Value::Int(2));
    let remaining: Vec<u32> = engine.tasks().keys().copied().collect();
    assert_eq!(remaining, vec![1]);
    assert_eq!(engine.task(1).map(|t| t.ticks), Some(0));
}

#[test]
fn test_bulk_stop_helpers() {
    let mut help = script("Help", 2, 0, 0, &[], 0);
    help.script_type = ScriptType::HELP;
    help.filename = "tutorial.txt".to_string();
    let file = program(
        &[],
        vec![with_operand(Opcode::Jmp, Mode::BACKWARD, 0)],
        vec![script("Main", 1, 0, 0, &[], 0), help],
        vec![1, 2, 1, 2],
    );
    let (mut engine, recorder) = load(&file, vec![]);
    assert_eq!(engine.tasks().len(), 4);

    engine.stop_tasks_of_type(ScriptType::HELP);
    let remaining: Vec<u32> = engine.tasks().keys().copied().collect();
    assert_eq!(remaining, vec![1, 3]);

    engine.start_script(2);
    engine.stop_scripts(|name, _| name == "Main");
    let remaining: Vec<u32> = engine.tasks().keys().copied().collect();
    assert_eq!(remaining, vec![5]);

    engine.stop_scripts(|_, filename| filename == "tutorial.txt");
    assert!(engine.tasks().is_empty());
    assert_eq!(recorder.0.borrow().stopped, vec![2, 4, 1, 3, 5]);

    engine.start_script(1);
    engine.start_script(1);
    engine.stop_all_tasks();
    assert!(engine.tasks().is_empty());
    assert!(recorder.error_codes().is_empty());
}

#[test]
fn test_reboot_clears_everything() {
    let (mut engine, _) = load(&caller_program(Mode::SYNC), vec![]);
    engine.look_in(ScriptType::ALL);

    engine.reboot();

    assert!(engine.tasks().is_empty());
    assert!(engine.scripts().is_empty());
    assert!(engine.instructions().is_empty());
    assert_eq!(engine.ticks(), 0);
    assert_eq!(engine.highest_task_id(), 0);
    assert_eq!(engine.executed_instructions(), 0);
}
