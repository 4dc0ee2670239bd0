//! Main TUI application state and logic

use crate::disasm::{Disassembler, ListingLine};
use crate::interpreter::engine::Engine;
use crate::interpreter::task::Task;
use crate::program::ScriptType;
use crate::snapshot::{HistoryError, TickHistory};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

use super::panes::{self, CodeScrollState, StatusRenderData};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Code,
    Tasks,
    Stack,
    Globals,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: code -> tasks -> stack -> globals)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Code => FocusedPane::Tasks,
            FocusedPane::Tasks => FocusedPane::Stack,
            FocusedPane::Stack => FocusedPane::Globals,
            FocusedPane::Globals => FocusedPane::Code,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Code => FocusedPane::Globals,
            FocusedPane::Tasks => FocusedPane::Code,
            FocusedPane::Stack => FocusedPane::Tasks,
            FocusedPane::Globals => FocusedPane::Stack,
        }
    }
}

/// The main application state
pub struct App {
    pub engine: Engine,

    /// Engine state before each tick run from the viewer
    pub history: TickHistory,

    /// Script types scheduled on each tick
    pub mask: ScriptType,

    /// Disassembly of the loaded program
    pub listing: Vec<ListingLine>,

    pub focused_pane: FocusedPane,

    /// Index into the engine's task list
    pub selected_task: usize,

    /// Per-pane scroll offsets
    pub code_scroll: CodeScrollState,
    pub stack_scroll: usize,
    pub globals_scroll: usize,

    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,
    pub status_is_error: bool,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a tick was run in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,

    /// Delay between ticks in play mode
    pub play_interval: Duration,
}

impl App {
    /// Create a new app over a loaded engine
    pub fn new(engine: Engine, history: TickHistory, mask: ScriptType) -> Self {
        let listing = Disassembler::for_engine(&engine).listing();
        let play_interval = Duration::from_secs_f32(engine.config().tick_duration.max(0.05));
        App {
            engine,
            history,
            mask,
            listing,
            focused_pane: FocusedPane::Code,
            selected_task: 0,
            code_scroll: CodeScrollState::new(),
            stack_scroll: 0,
            globals_scroll: 0,
            should_quit: false,
            status_message: String::from("Ready!"),
            status_is_error: false,
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: Instant::now()
                .checked_sub(Duration::from_secs(1))
                .unwrap_or(Instant::now()),
            play_interval,
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= self.play_interval {
                if !self.tick_forward() {
                    self.is_playing = false;
                }
                self.last_play_time = Instant::now();
            }

            // Use poll with timeout to allow auto-play to work
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Task shown in the code and stack panes
    pub fn selected(&self) -> Option<&Task> {
        self.engine.tasks().values().nth(self.selected_task)
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // 4 panes in 2 columns, plus status bar at bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Code (top) | Tasks (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Stack (top) | Globals (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(columns[1]);

        let selected = self.engine.tasks().values().nth(self.selected_task);
        let current_address = selected.map(|task| task.instruction_address);
        let other_addresses: Vec<u32> = self
            .engine
            .tasks()
            .values()
            .filter(|task| Some(task.id) != selected.map(|s| s.id))
            .map(|task| task.instruction_address)
            .collect();
        let parameter_count = selected
            .and_then(|task| self.engine.script(task.script_id))
            .map_or(0, |script| script.parameter_count as usize);

        panes::render_code_pane(
            frame,
            left_rows[0],
            &self.listing,
            current_address,
            &other_addresses,
            self.focused_pane == FocusedPane::Code,
            &mut self.code_scroll,
        );

        panes::render_tasks_pane(
            frame,
            left_rows[1],
            self.engine.tasks().values(),
            self.selected_task,
            self.focused_pane == FocusedPane::Tasks,
        );

        panes::render_stack_pane(
            frame,
            right_rows[0],
            selected,
            self.engine.main_stack(),
            parameter_count,
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
        );

        panes::render_globals_pane(
            frame,
            right_rows[1],
            self.engine.variables(),
            self.focused_pane == FocusedPane::Globals,
            &mut self.globals_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                ticks: self.engine.ticks(),
                executed_instructions: self.engine.executed_instructions(),
                task_count: self.engine.tasks().len(),
                history_len: self.history.len(),
                is_playing: self.is_playing,
                is_error: self.status_is_error,
            },
        );
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.tick_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.tick_forward();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Code => {
                    // Scrolling up makes the current instruction move down visually
                    if let Some(row) = self.code_scroll.target_line_row {
                        self.code_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                    self.code_scroll.offset = self.code_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Tasks => {
                    self.selected_task = self.selected_task.saturating_sub(1);
                    self.stack_scroll = 0;
                }
                FocusedPane::Stack => {
                    self.stack_scroll = self.stack_scroll.saturating_sub(1);
                }
                FocusedPane::Globals => {
                    self.globals_scroll = self.globals_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Code => {
                    if let Some(row) = self.code_scroll.target_line_row {
                        self.code_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                    self.code_scroll.offset = self.code_scroll.offset.saturating_add(1);
                }
                FocusedPane::Tasks => {
                    self.selected_task = self.selected_task.saturating_add(1);
                    self.clamp_selection();
                    self.stack_scroll = 0;
                }
                FocusedPane::Stack => {
                    self.stack_scroll = self.stack_scroll.saturating_add(1);
                }
                FocusedPane::Globals => {
                    self.globals_scroll = self.globals_scroll.saturating_add(1);
                }
            },
            KeyCode::Char(' ') => {
                // Toggle auto-play mode (with 200ms debounce to prevent key repeat spam)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(self.play_interval)
                            .unwrap_or(Instant::now());
                        self.set_status("Playing...");
                    } else {
                        self.set_status("Paused");
                    }
                }
            }
            _ => {}
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_is_error = false;
    }

    fn set_error(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_is_error = true;
    }

    fn clamp_selection(&mut self) {
        let count = self.engine.tasks().len();
        self.selected_task = self.selected_task.min(count.saturating_sub(1));
    }

    /// Record the current state and run one scheduler tick. Returns false
    /// when the tick was refused.
    pub fn tick_forward(&mut self) -> bool {
        match self.history.record(&self.engine) {
            Ok(()) => {}
            Err(HistoryError::LimitExceeded { limit, .. }) => {
                self.set_error(format!("Tick history full ({} bytes)", limit));
                return false;
            }
            Err(e) => {
                self.set_error(format!("Error: {}", e));
                return false;
            }
        }

        self.engine.look_in(self.mask);
        self.clamp_selection();
        debug!(tick = self.engine.ticks(), "viewer tick");
        self.set_status(format!("Ran tick {}", self.engine.ticks()));
        true
    }

    /// Restore the state recorded before the last tick
    pub fn tick_backward(&mut self) -> bool {
        let Some(state) = self.history.pop() else {
            self.set_error("Cannot step backward: at the first recorded tick");
            return false;
        };

        match state.restore(&mut self.engine) {
            Ok(()) => {
                self.clamp_selection();
                self.set_status(format!("Back to tick {}", state.tick));
                true
            }
            Err(e) => {
                self.set_error(format!("Cannot step backward: {}", e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LhvmFile;
    use crate::interpreter::config::EngineConfig;
    use crate::interpreter::host::NullHost;
    use crate::memory::value::{DataType, Value};
    use crate::program::{Instruction, Mode, Opcode, Script};

    fn counting_app(history_limit: usize) -> App {
        let file = LhvmFile {
            variable_names: vec!["count".to_string()],
            instructions: vec![
                Instruction::push_var(DataType::Int, 1),
                Instruction::push(Value::Int(1)),
                Instruction::typed(Opcode::Add, DataType::Int),
                Instruction::pop_var(DataType::Int, 1),
                Instruction::new(Opcode::Jmp, Mode::BACKWARD, DataType::None, 0),
            ],
            autostart: vec![1],
            scripts: vec![Script {
                name: "Counter".to_string(),
                filename: "counter.txt".to_string(),
                script_type: ScriptType::SCRIPT,
                variables_offset: 1,
                variables: Vec::new(),
                instruction_address: 0,
                parameter_count: 0,
                script_id: 1,
            }],
            ..LhvmFile::default()
        };
        let mut engine = Engine::new(Vec::new(), NullHost, EngineConfig::default());
        engine.load_file(&file).unwrap();
        App::new(engine, TickHistory::new(history_limit), ScriptType::ALL)
    }

    #[test]
    fn stepping_back_restores_the_previous_tick() {
        let mut app = counting_app(usize::MAX);
        assert!(app.tick_forward());
        assert!(app.tick_forward());
        assert_eq!(app.engine.variables()[1].value, Value::Int(2));

        assert!(app.tick_backward());
        assert_eq!(app.engine.ticks(), 1);
        assert_eq!(app.engine.variables()[1].value, Value::Int(1));
        assert_eq!(app.history.len(), 1);

        assert!(app.tick_backward());
        assert!(!app.tick_backward());
        assert!(app.status_is_error);
    }

    #[test]
    fn full_history_refuses_to_tick() {
        let mut app = counting_app(0);
        assert!(!app.tick_forward());
        assert_eq!(app.engine.ticks(), 0);
        assert!(app.status_is_error);
    }

    #[test]
    fn listing_covers_the_program() {
        let app = counting_app(usize::MAX);
        assert_eq!(app.listing.iter().filter(|l| l.address().is_some()).count(), 5);
        assert_eq!(app.selected().map(|t| t.id), Some(1));
    }

    #[test]
    fn focus_cycles_through_every_pane() {
        let mut pane = FocusedPane::Code;
        for _ in 0..4 {
            assert_eq!(pane.next().prev(), pane);
            pane = pane.next();
        }
        assert_eq!(pane, FocusedPane::Code);
    }
}
