//! Program inspection: disassembly and text dumps
//!
//! [`Disassembler`] turns a loaded program into readable assembly. It names
//! jump targets (`<script>_loop_N`, `<script>_skip_N`,
//! `<script>_exception_handler_N`), resolves variable ids to their global or
//! local names and shows native functions and called scripts by name.
//!
//! The `print_*` functions write the sections shown by `lhvm dump`.

use crate::codec::LhvmFile;
use crate::interpreter::engine::Engine;
use crate::interpreter::host::NativeFunction;
use crate::memory::stack::Stack;
use crate::memory::value::DataType;
use crate::memory::VarRef;
use crate::program::{Instruction, Mode, Opcode, Script};
use rustc_hash::FxHashMap;
use std::io::{self, Write};

/// `script Name(param, param)`
pub fn signature(script: &Script) -> String {
    format!(
        "{} {}({})",
        script.script_type,
        script.name,
        script.parameters().join(", ")
    )
}

/// Assign a label to every jump and handler target reachable from a script
/// entry point before its `END`
pub fn labels(instructions: &[Instruction], scripts: &[Script]) -> FxHashMap<u32, String> {
    let mut labels = FxHashMap::default();
    for script in scripts {
        let mut count = 0;
        let start = script.instruction_address as usize;
        for instr in instructions.iter().skip(start) {
            let kind = match (instr.opcode, instr.mode) {
                (Opcode::Except, _) => "exception_handler",
                (Opcode::Jmp | Opcode::Jz, Mode::BACKWARD) => "loop",
                (Opcode::Jmp | Opcode::Jz, _) => "skip",
                (Opcode::End, _) => break,
                _ => continue,
            };
            labels
                .entry(instr.operand)
                .or_insert_with(|| format!("{}_{}_{}", script.name, kind, count));
            count += 1;
        }
    }
    labels
}

/// Context-free rendering, used for instruction traces
pub fn mnemonic(instr: &Instruction) -> String {
    let suffix = instr.data_type.suffix();
    match instr.opcode {
        Opcode::Push | Opcode::Pop if instr.mode == Mode::REFERENCE => {
            format!("{}{} [{}]", instr.opcode, suffix, instr.operand)
        }
        Opcode::Push => format!("{}{} {}", instr.opcode, suffix, immediate(instr)),
        Opcode::Jmp | Opcode::Jz | Opcode::Except | Opcode::Sys | Opcode::Line => {
            format!("{} {}", instr.opcode, instr.operand)
        }
        Opcode::Call if instr.mode == Mode::ASYNC => format!("CALL async {}", instr.operand),
        Opcode::Call => format!("CALL {}", instr.operand),
        _ => shared_form(instr).unwrap_or_else(|| format!("{}{}", instr.opcode, suffix)),
    }
}

fn immediate(instr: &Instruction) -> String {
    match instr.data_type {
        DataType::Float | DataType::Vector => format!("{:.6}", instr.float_operand()),
        DataType::Object => instr.operand.to_string(),
        _ => instr.int_operand().to_string(),
    }
}

/// Renderings that need no program context
fn shared_form(instr: &Instruction) -> Option<String> {
    let text = match instr.opcode {
        Opcode::EndExcept if instr.mode == Mode::YIELD => "YIELD".to_string(),
        Opcode::EndExcept => "ENDEXCEPT".to_string(),
        Opcode::Swap if instr.data_type == DataType::Int && instr.operand != 0 => {
            let direction = if instr.mode == Mode::COPY_FROM { "from" } else { "to" };
            format!("COPY {} {}", direction, instr.int_operand())
        }
        Opcode::Swap => "SWAP".to_string(),
        Opcode::Pop => format!("POP{}", instr.data_type.suffix()),
        _ => return None,
    };
    Some(text)
}

/// One line of a code listing
#[derive(Debug, Clone, PartialEq)]
pub enum ListingLine {
    Begin(String),
    Local(String),
    Label(String),
    Instruction { address: u32, text: String },
    Blank,
}

impl ListingLine {
    pub fn address(&self) -> Option<u32> {
        match self {
            ListingLine::Instruction { address, .. } => Some(*address),
            _ => None,
        }
    }
}

/// Disassembler over a program's tables
pub struct Disassembler<'a> {
    variable_names: &'a [String],
    instructions: &'a [Instruction],
    scripts: &'a [Script],
    natives: &'a [NativeFunction],
    labels: FxHashMap<u32, String>,
}

impl<'a> Disassembler<'a> {
    pub fn new(
        variable_names: &'a [String],
        instructions: &'a [Instruction],
        scripts: &'a [Script],
    ) -> Self {
        Disassembler {
            variable_names,
            instructions,
            scripts,
            natives: &[],
            labels: labels(instructions, scripts),
        }
    }

    pub fn for_file(file: &'a LhvmFile) -> Self {
        Self::new(&file.variable_names, &file.instructions, &file.scripts)
    }

    /// Disassemble an engine's program, naming its native functions
    pub fn for_engine(engine: &'a Engine) -> Self {
        Self::new(
            engine.variable_names(),
            engine.instructions(),
            engine.scripts(),
        )
        .with_natives(engine.functions())
    }

    pub fn with_natives(mut self, natives: &'a [NativeFunction]) -> Self {
        self.natives = natives;
        self
    }

    pub fn label(&self, address: u32) -> Option<&str> {
        self.labels.get(&address).map(String::as_str)
    }

    /// Script whose code contains `address`
    pub fn script_at(&self, address: u32) -> Option<&'a Script> {
        self.scripts
            .iter()
            .filter(|script| script.instruction_address <= address)
            .max_by_key(|script| script.instruction_address)
    }

    fn variable_name(&self, script: &Script, id: u32) -> String {
        match VarRef::resolve(id, script.variables_offset) {
            VarRef::Global(0) => "null".to_string(),
            VarRef::Global(index) => match self.variable_names.get(index - 1) {
                Some(name) => format!("global {}", name),
                None => format!("global #{}", id),
            },
            VarRef::Local(index) => match script.variables.get(index) {
                Some(name) => format!("local {}", name),
                None => format!("local #{}", id),
            },
        }
    }

    fn target(&self, address: u32) -> String {
        self.label(address)
            .map(str::to_string)
            .unwrap_or_else(|| address.to_string())
    }

    /// Render one instruction in the context of the script that owns it
    pub fn render(&self, script: &Script, instr: &Instruction) -> String {
        let suffix = instr.data_type.suffix();
        match instr.opcode {
            Opcode::Push | Opcode::Pop if instr.mode == Mode::REFERENCE => format!(
                "{}{} {}",
                instr.opcode,
                suffix,
                self.variable_name(script, instr.operand)
            ),
            Opcode::Push => format!("PUSH{} {}", suffix, immediate(instr)),
            Opcode::Cast if instr.mode == Mode::ZERO => {
                format!("ZERO {}", self.variable_name(script, instr.operand))
            }
            Opcode::Jmp | Opcode::Jz | Opcode::Except => {
                format!("{} {}", instr.opcode, self.target(instr.operand))
            }
            Opcode::Sys => match self.natives.get(instr.operand as usize) {
                Some(func) => format!("SYS {}", func.name),
                None => format!("SYS {}", instr.operand),
            },
            Opcode::Call => {
                let mode = if instr.mode == Mode::ASYNC { "async " } else { "" };
                let callee = instr
                    .operand
                    .checked_sub(1)
                    .and_then(|index| self.scripts.get(index as usize));
                match callee {
                    Some(callee) => format!("CALL {}{}", mode, callee.name),
                    None => format!("CALL {}{}", mode, instr.operand),
                }
            }
            Opcode::Line => format!("LINE {}", instr.operand),
            _ => shared_form(instr).unwrap_or_else(|| format!("{}{}", instr.opcode, suffix)),
        }
    }

    /// Listing of one script, from its entry point through its `END`
    pub fn script_listing(&self, script: &Script) -> Vec<ListingLine> {
        let mut lines = vec![ListingLine::Begin(signature(script))];
        let locals = script.variables.iter().skip(script.parameter_count as usize);
        lines.extend(locals.map(|name| ListingLine::Local(name.clone())));

        let start = script.instruction_address as usize;
        for (address, instr) in self.instructions.iter().enumerate().skip(start) {
            let address = address as u32;
            if let Some(label) = self.label(address) {
                lines.push(ListingLine::Label(label.to_string()));
            }
            lines.push(ListingLine::Instruction {
                address,
                text: self.render(script, instr),
            });
            if instr.opcode == Opcode::End {
                break;
            }
        }
        lines.push(ListingLine::Blank);
        lines
    }

    /// Listing of every script in table order
    pub fn listing(&self) -> Vec<ListingLine> {
        self.scripts
            .iter()
            .flat_map(|script| self.script_listing(script))
            .collect()
    }
}

/// Sections printed by `lhvm dump`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Info,
    All,
    Header,
    Globals,
    Code,
    Autostart,
    Scripts,
    Data,
    Stack,
    Values,
    Tasks,
    RuntimeInfo,
}

/// Write one section of `file`
pub fn dump<W: Write>(out: &mut W, file: &LhvmFile, section: Section) -> io::Result<()> {
    match section {
        Section::Info => print_info(out, file),
        Section::All => {
            print_info(out, file)?;
            print_autostart(out, file)?;
            print_globals(out, file)?;
            print_scripts(out, file)?;
            print_data(out, file)?;
            if file.has_status() {
                print_runtime_info(out, file)?;
                print_values(out, file)?;
                print_global_stack(out, file)?;
                print_tasks(out, file)?;
            }
            Ok(())
        }
        Section::Header => print_header(out, file),
        Section::Globals => print_globals(out, file),
        Section::Code => print_code(out, file),
        Section::Autostart => print_autostart(out, file),
        Section::Scripts => print_scripts(out, file),
        Section::Data => print_data(out, file),
        Section::Stack => print_global_stack(out, file),
        Section::Values => print_values(out, file),
        Section::Tasks => print_tasks(out, file),
        Section::RuntimeInfo => print_runtime_info(out, file),
    }
}

pub fn print_info<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    writeln!(out, "LHVM Version: {}", file.version)?;
    writeln!(out, "Global vars count: {}", file.variable_names.len())?;
    writeln!(out, "Scripts count: {}", file.scripts.len())?;
    writeln!(out, "Instructions count: {}", file.instructions.len())?;
    writeln!(out, "Autostart count: {}", file.autostart.len())?;
    writeln!(out, "Data size: {}", file.data.len())?;
    writeln!(out)?;
    match &file.status {
        Some(status) => {
            writeln!(out, "--- Status data ---")?;
            writeln!(out, "Tasks count: {}", status.tasks.len())?;
            write_runtime_counters(out, file)?;
        }
        None => {
            writeln!(out, "--- No status data ---")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn print_header<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    writeln!(out, "Magic: LHVM")?;
    writeln!(out, "Version: {}", file.version)?;
    writeln!(out)
}

pub fn print_globals<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    writeln!(out, "Global variables:")?;
    // id 0 is the null variable, added at runtime
    for (i, name) in file.variable_names.iter().enumerate() {
        writeln!(out, "{}: {}", i + 1, name)?;
    }
    writeln!(out)
}

pub fn print_code<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    writeln!(out, "Code:")?;
    for line in Disassembler::for_file(file).listing() {
        match line {
            ListingLine::Begin(sig) => writeln!(out, "begin {}", sig)?,
            ListingLine::Local(name) => writeln!(out, "\tLocal {}", name)?,
            ListingLine::Label(label) => writeln!(out, "{}:", label)?,
            ListingLine::Instruction { text, .. } => writeln!(out, "\t{}", text)?,
            ListingLine::Blank => writeln!(out)?,
        }
    }
    writeln!(out)
}

pub fn print_autostart<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    writeln!(out, "Autostart scripts:")?;
    for id in &file.autostart {
        match file.script(*id) {
            Some(script) => writeln!(out, "{}", script.name)?,
            None => writeln!(out, "<missing script {}>", id)?,
        }
    }
    writeln!(out)
}

pub fn print_scripts<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    writeln!(out, "Scripts:")?;
    for script in &file.scripts {
        writeln!(out, "{} = {}", signature(script), script.instruction_address)?;
    }
    writeln!(out)
}

pub fn print_data<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    writeln!(out, "Data:")?;
    let mut offset = 0;
    while offset < file.data.len() {
        let text = file.string_at(offset as u32).unwrap_or_default();
        writeln!(out, "{}: {}", offset, text)?;
        offset += text.len() + 1;
    }
    writeln!(out)
}

pub fn print_stack<W: Write>(out: &mut W, stack: &Stack) -> io::Result<()> {
    writeln!(out, "Stack:")?;
    for (i, value) in stack.values().iter().enumerate() {
        writeln!(out, "{}: {}", i, value)?;
    }
    writeln!(out)
}

pub fn print_global_stack<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    match &file.status {
        Some(status) => print_stack(out, &status.stack),
        None => writeln!(out, "--- No status data ---"),
    }
}

pub fn print_values<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    let Some(status) = &file.status else {
        return writeln!(out, "--- No status data ---");
    };
    writeln!(out, "Global variables values:")?;
    for (i, var) in status.variable_values.iter().enumerate() {
        writeln!(out, "{}, {} = {}", i + 1, var.name, var.value)?;
    }
    writeln!(out)
}

pub fn print_tasks<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    let Some(status) = &file.status else {
        return writeln!(out, "--- No status data ---");
    };
    writeln!(out, "Active tasks:")?;
    for task in &status.tasks {
        writeln!(out, "Task number: {}", task.id)?;
        writeln!(out, "Type: {}", task.script_type)?;
        writeln!(out, "Script ID: {}", task.script_id)?;
        writeln!(out, "Script name: {}", task.name)?;
        writeln!(out, "Filename: {}", task.filename)?;
        writeln!(out, "Instruction address: {}", task.instruction_address)?;
        writeln!(out, "Prev instruction address: {}", task.prev_instruction_address)?;
        writeln!(out, "Ticks: {}", task.ticks)?;
        writeln!(out, "Sleeping: {}", task.sleeping)?;
        writeln!(out, "Waiting task number: {}", task.waiting_task_id)?;
        writeln!(out, "Stop: {}", task.stop)?;
        writeln!(out, "Yield: {}", task.yield_requested)?;
        writeln!(out, "In exception handler: {}", task.in_exception_handler)?;
        writeln!(
            out,
            "Current exception handler index: {}",
            task.current_exception_handler_index
        )?;
        writeln!(out, "Exception handlers instructions pointers:")?;
        for ip in &task.exception_handlers {
            writeln!(out, "{}", ip)?;
        }
        writeln!(out)?;
        writeln!(out, "Local variables offset: {}", task.variables_offset)?;
        writeln!(out, "Variables:")?;
        for (i, var) in task.locals.iter().enumerate() {
            let id = task.variables_offset as usize + 1 + i;
            writeln!(out, "{}, {} = {}", id, var.name, var.value)?;
        }
        writeln!(out)?;
        print_stack(out, &task.stack)?;
        writeln!(out, "----------------------------------------")?;
        writeln!(out)?;
    }
    writeln!(out)
}

pub fn print_runtime_info<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    if file.status.is_none() {
        return writeln!(out, "--- No status data ---");
    }
    write_runtime_counters(out, file)
}

fn write_runtime_counters<W: Write>(out: &mut W, file: &LhvmFile) -> io::Result<()> {
    let Some(status) = &file.status else {
        return Ok(());
    };
    writeln!(out, "Ticks count: {}", status.ticks)?;
    writeln!(out, "Current line number: {}", status.current_line)?;
    writeln!(out, "Highest task ID: {}", status.highest_task_id)?;
    writeln!(out, "Highest script ID: {}", status.highest_script_id)?;
    writeln!(out, "Executed instructions: {}", status.executed_instructions)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::Value;
    use crate::program::ScriptType;

    fn sample() -> LhvmFile {
        let script = Script {
            name: "Main".to_string(),
            filename: "main.txt".to_string(),
            script_type: ScriptType::SCRIPT,
            variables_offset: 1,
            variables: vec!["speed".to_string(), "i".to_string()],
            instruction_address: 0,
            parameter_count: 1,
            script_id: 1,
        };
        LhvmFile {
            variable_names: vec!["counter".to_string()],
            instructions: vec![
                Instruction::push_var(DataType::Float, 2),
                Instruction::new(Opcode::Jz, Mode::FORWARD, DataType::None, 4),
                Instruction::new(Opcode::Sys, Mode::default(), DataType::None, 0),
                Instruction::new(Opcode::Jmp, Mode::BACKWARD, DataType::None, 0),
                Instruction::bare(Opcode::End),
            ],
            autostart: vec![1],
            scripts: vec![script],
            data: b"hello\0world\0".to_vec(),
            ..LhvmFile::default()
        }
    }

    fn render(file: &LhvmFile, section: Section) -> String {
        let mut out = Vec::new();
        dump(&mut out, file, section).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn signature_lists_parameters_only() {
        let file = sample();
        assert_eq!(signature(&file.scripts[0]), "script Main(speed)");
    }

    #[test]
    fn jump_targets_are_labelled_per_script() {
        let file = sample();
        let labels = labels(&file.instructions, &file.scripts);
        assert_eq!(labels.get(&4).map(String::as_str), Some("Main_skip_0"));
        assert_eq!(labels.get(&0).map(String::as_str), Some("Main_loop_1"));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn listing_resolves_names_and_labels() {
        let file = sample();
        let lines = Disassembler::for_file(&file).listing();
        let text: Vec<String> = lines
            .iter()
            .filter_map(|line| match line {
                ListingLine::Instruction { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            text,
            vec!["PUSHF local speed", "JZ Main_skip_0", "SYS 0", "JMP Main_loop_1", "END"]
        );
        assert_eq!(lines[0], ListingLine::Begin("script Main(speed)".to_string()));
        assert_eq!(lines[1], ListingLine::Local("i".to_string()));
        assert_eq!(lines[2], ListingLine::Label("Main_loop_1".to_string()));
        assert_eq!(lines.last(), Some(&ListingLine::Blank));
    }

    #[test]
    fn natives_are_shown_by_name() {
        let file = sample();
        let natives = vec![NativeFunction::unbound("GET_TOWN", 1, 1)];
        let disasm = Disassembler::for_file(&file).with_natives(&natives);
        assert_eq!(disasm.render(&file.scripts[0], &file.instructions[2]), "SYS GET_TOWN");
    }

    #[test]
    fn mnemonics_need_no_context() {
        assert_eq!(mnemonic(&Instruction::push(Value::Int(-3))), "PUSHI -3");
        assert_eq!(mnemonic(&Instruction::pop_var(DataType::Object, 7)), "POPO [7]");
        assert_eq!(
            mnemonic(&Instruction::new(Opcode::EndExcept, Mode::YIELD, DataType::None, 0)),
            "YIELD"
        );
        assert_eq!(
            mnemonic(&Instruction::new(Opcode::Swap, Mode::COPY_FROM, DataType::Int, 2)),
            "COPY from 2"
        );
        assert_eq!(
            mnemonic(&Instruction::new(Opcode::Call, Mode::ASYNC, DataType::None, 3)),
            "CALL async 3"
        );
    }

    #[test]
    fn data_pool_is_split_into_strings() {
        let text = render(&sample(), Section::Data);
        assert_eq!(text, "Data:\n0: hello\n6: world\n\n");
    }

    #[test]
    fn info_reports_missing_status() {
        let text = render(&sample(), Section::Info);
        assert!(text.starts_with("LHVM Version: 7\n"));
        assert!(text.contains("Scripts count: 1\n"));
        assert!(text.contains("--- No status data ---"));
        assert_eq!(render(&sample(), Section::Tasks), "--- No status data ---\n");
    }

    #[test]
    fn code_section_prints_listing() {
        let text = render(&sample(), Section::Code);
        assert!(text.contains("begin script Main(speed)\n\tLocal i\nMain_loop_1:\n\tPUSHF local speed\n"));
        assert!(text.contains("Main_skip_0:\n\tEND\n"));
    }
}
