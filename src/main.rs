// lhvm: run, inspect and step through LHVM programs and save files

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use lhvm::codec::LhvmFile;
use lhvm::disasm::{self, Section};
use lhvm::interpreter::config::EngineConfig;
use lhvm::interpreter::engine::Engine;
use lhvm::interpreter::host::NullHost;
use lhvm::program::ScriptType;
use lhvm::snapshot::TickHistory;
use lhvm::ui::App;

#[derive(Parser)]
#[command(
    name = "lhvm",
    about = "Run, inspect and step through LHVM programs and save files",
    version
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a short summary of a program or save file
    Info { file: PathBuf },

    /// Print one section of a program or save file
    Dump {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = DumpSection::All)]
        section: DumpSection,
    },

    /// Run a number of scheduler ticks, optionally saving the resulting state
    Run {
        file: PathBuf,

        #[arg(short, long, default_value_t = 1)]
        ticks: u32,

        /// Script types to schedule (repeatable, default all)
        #[arg(short, long, value_enum)]
        mask: Vec<MaskArg>,

        /// Seconds per tick, used by SLEEP
        #[arg(long)]
        tick_duration: Option<f32>,

        /// Log every executed instruction at trace level
        #[arg(long)]
        trace: bool,

        /// Write a save file after the last tick
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Open the terminal viewer
    View {
        file: PathBuf,

        #[arg(short, long, value_enum)]
        mask: Vec<MaskArg>,

        #[arg(long)]
        tick_duration: Option<f32>,

        /// Memory available for stepping back, in megabytes
        #[arg(long, default_value_t = 256)]
        history_limit: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DumpSection {
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

impl From<DumpSection> for Section {
    fn from(section: DumpSection) -> Self {
        match section {
            DumpSection::Info => Section::Info,
            DumpSection::All => Section::All,
            DumpSection::Header => Section::Header,
            DumpSection::Globals => Section::Globals,
            DumpSection::Code => Section::Code,
            DumpSection::Autostart => Section::Autostart,
            DumpSection::Scripts => Section::Scripts,
            DumpSection::Data => Section::Data,
            DumpSection::Stack => Section::Stack,
            DumpSection::Values => Section::Values,
            DumpSection::Tasks => Section::Tasks,
            DumpSection::RuntimeInfo => Section::RuntimeInfo,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MaskArg {
    Script,
    Help,
    ChallengeHelp,
    TempleHelp,
    TempleSpecial,
    MultiplayerHelp,
}

impl From<MaskArg> for ScriptType {
    fn from(mask: MaskArg) -> Self {
        match mask {
            MaskArg::Script => ScriptType::SCRIPT,
            MaskArg::Help => ScriptType::HELP,
            MaskArg::ChallengeHelp => ScriptType::CHALLENGE_HELP,
            MaskArg::TempleHelp => ScriptType::TEMPLE_HELP,
            MaskArg::TempleSpecial => ScriptType::TEMPLE_SPECIAL,
            MaskArg::MultiplayerHelp => ScriptType::MULTIPLAYER_HELP,
        }
    }
}

fn script_mask(args: &[MaskArg]) -> ScriptType {
    if args.is_empty() {
        return ScriptType::ALL;
    }
    args.iter()
        .map(|&arg| ScriptType::from(arg))
        .fold(ScriptType::NONE, |mask, ty| mask | ty)
}

fn init_logging(verbose: bool, to_terminal: bool) {
    let default = if verbose { "lhvm=debug" } else { "lhvm=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());

    // The viewer owns the terminal; log lines would tear the screen
    if to_terminal {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .init();
    }
}

/// Load a program, or restore it when the file carries runtime status
fn open_engine(path: &Path, config: EngineConfig) -> Result<Engine, Box<dyn std::error::Error>> {
    let file = LhvmFile::open(path)?;
    let mut engine = Engine::new(Vec::new(), NullHost, config);
    if file.has_status() {
        engine.restore_file(&file)?;
    } else {
        engine.load_file(&file)?;
    }
    Ok(engine)
}

fn engine_config(tick_duration: Option<f32>, trace: bool) -> EngineConfig {
    let config = EngineConfig::default().with_tracing(trace);
    match tick_duration {
        Some(seconds) => config.with_tick_duration(seconds),
        None => config,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, !matches!(cli.command, Command::View { .. }));

    match cli.command {
        Command::Info { file } => {
            let file = LhvmFile::open(&file)?;
            let mut out = io::stdout().lock();
            disasm::dump(&mut out, &file, Section::Info)?;
            out.flush()?;
        }
        Command::Dump { file, section } => {
            let file = LhvmFile::open(&file)?;
            let mut out = io::stdout().lock();
            disasm::dump(&mut out, &file, section.into())?;
            out.flush()?;
        }
        Command::Run {
            file,
            ticks,
            mask,
            tick_duration,
            trace,
            save,
        } => {
            let mut engine = open_engine(&file, engine_config(tick_duration, trace))?;
            let mask = script_mask(&mask);
            for _ in 0..ticks {
                engine.look_in(mask);
            }
            info!(
                ticks = engine.ticks(),
                executed = engine.executed_instructions(),
                tasks = engine.tasks().len(),
                "run finished"
            );

            let mut out = io::stdout().lock();
            disasm::dump(&mut out, &engine.to_file(true), Section::RuntimeInfo)?;
            out.flush()?;

            if let Some(save) = save {
                engine.save_state(&save)?;
            }
        }
        Command::View {
            file,
            mask,
            tick_duration,
            history_limit,
        } => {
            let engine = open_engine(&file, engine_config(tick_duration, false))?;
            let history = TickHistory::new(history_limit.saturating_mul(1024 * 1024));

            // Set up terminal
            enable_raw_mode()?;
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen)?;
            let backend = CrosstermBackend::new(stdout);
            let mut terminal = Terminal::new(backend)?;

            let mut app = App::new(engine, history, script_mask(&mask));
            let res = app.run(&mut terminal);

            // Restore terminal
            disable_raw_mode()?;
            execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
            terminal.show_cursor()?;

            if let Err(err) = res {
                eprintln!("Error: {:?}", err);
            }
        }
    }

    Ok(())
}
