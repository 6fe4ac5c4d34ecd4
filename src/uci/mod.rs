//! Universal Chess Interface (UCI) protocol implementation.
//!
//! [`Uci`] reads commands line by line, keeps the session state (selected
//! engine, option table, current position) and hands long running work to
//! a [`BackgroundTaskManager`] so that `stop` and `isready` are answered
//! while an engine searches.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};

use crate::config::PerftTestData;
use crate::engine::background::panic_message;
use crate::engine::{
    self, BackgroundTaskManager, CancelAction, Engine, EngineError, ErrorSink, LongRunningTask,
    Perft, PositionSpec, SharedEngine, START_FEN,
};
use crate::sync::StopFlag;
use crate::timer::DeadlineTimer;

pub mod command;
pub mod moves;
pub mod options;
pub mod parameters;
pub mod print;
pub mod report;

use command::{parse_uci_command, CommandLine, UciCommand};
use moves::UciMove;
use options::{CheckOption, OptionError, OptionTable, SpinOption, UciOption};
use parameters::{
    GoParameters, Parser, PerfStatsParameters, PerftParameters, GO_PARSER, PERFT_PARSER,
    PERF_STATS_PARSER,
};
use print::{fault_dump, UciOutput};

const CHESS960_OPTION: &str = "UCI_Chess960";
const OWN_BOOK_OPTION: &str = "OwnBook";
const HASH_OPTION: &str = "Hash";
const MAX_HASH_SIZE_MB: u32 = 64 * 1024;

const NO_POSITION_DEFINED: &str = "No position defined";
const ENGINE_BUSY: &str = "Engine is already working";

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("there's already an engine with id {0}")]
    DuplicateEngine(String),
    #[error("engine {0} is unknown")]
    UnknownEngine(String),
    #[error("cannot start the background worker")]
    Worker(#[from] io::Error),
}

/// What the command loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    Quit,
}

/// A UCI session.
pub struct Uci {
    engine: SharedEngine,
    engine_id: String,
    /// Registered engines, in registration order.
    engines: Vec<(String, SharedEngine)>,
    options: OptionTable,
    position: Option<PositionSpec>,
    debug_uci: bool,
    perft_data: Arc<Vec<PerftTestData>>,
    out: UciOutput,
    tasks: BackgroundTaskManager,
}

impl Uci {
    /// Create a session driving `default_engine`.
    ///
    /// # Errors
    ///
    /// Fails if the background worker cannot be started.
    pub fn new<E: Engine + 'static>(default_engine: E, out: UciOutput) -> Result<Self, UciError> {
        Self::with_shared_engine(engine::shared(default_engine), out)
    }

    /// Same as [`Uci::new`] for an engine that is already shared.
    ///
    /// # Errors
    ///
    /// Fails if the background worker cannot be started.
    pub fn with_shared_engine(engine: SharedEngine, out: UciOutput) -> Result<Self, UciError> {
        let sink_out = out.clone();
        let sink: ErrorSink = Arc::new(move |e: &anyhow::Error| {
            log::error!("background task failed: {e:#}");
            sink_out.lines(fault_dump(e));
        });
        let tasks = BackgroundTaskManager::new(sink)?;
        let engine_id = engine.lock().id().to_string();
        let options = build_options(&engine);
        Ok(Uci {
            engines: vec![(engine_id.clone(), Arc::clone(&engine))],
            engine,
            engine_id,
            options,
            position: None,
            debug_uci: false,
            perft_data: Arc::new(Vec::new()),
            out,
            tasks,
        })
    }

    /// Register another engine that `engine <id>` can switch to.
    ///
    /// # Errors
    ///
    /// Fails if an engine with the same id is already registered.
    pub fn add_engine<E: Engine + 'static>(&mut self, engine: E) -> Result<(), UciError> {
        self.add_shared_engine(engine::shared(engine))
    }

    /// # Errors
    ///
    /// Fails if an engine with the same id is already registered.
    pub fn add_shared_engine(&mut self, engine: SharedEngine) -> Result<(), UciError> {
        let id = engine.lock().id().to_string();
        if self.find_engine(&id).is_some() {
            return Err(UciError::DuplicateEngine(id));
        }
        log::debug!("engine {id} registered");
        self.engines.push((id, engine));
        Ok(())
    }

    /// Make a registered engine the current one.
    ///
    /// Clears the current position and rebuilds the option table, unless
    /// the engine is already selected.
    ///
    /// # Errors
    ///
    /// Fails if no engine has this id.
    pub fn select_engine(&mut self, id: &str) -> Result<(), UciError> {
        if id == self.engine_id {
            return Ok(());
        }
        let engine = self
            .find_engine(id)
            .ok_or_else(|| UciError::UnknownEngine(id.to_string()))?;
        log::info!("switching engine from {} to {id}", self.engine_id);
        self.options = build_options(&engine);
        self.engine = engine;
        self.engine_id = id.to_string();
        self.position = None;
        Ok(())
    }

    #[must_use]
    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    #[must_use]
    pub fn is_position_set(&self) -> bool {
        self.position.is_some()
    }

    #[must_use]
    pub fn options(&self) -> &OptionTable {
        &self.options
    }

    /// Turn `info string` diagnostics on or off.
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug_uci = enabled;
    }

    /// Positions used by the `test` command.
    pub fn set_perft_data(&mut self, data: Vec<PerftTestData>) {
        self.perft_data = Arc::new(data);
    }

    /// Read commands until `quit` or the end of `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from `input` fails. Lines that are not
    /// valid UTF-8 are decoded lossily and executed.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if matches!(line, Cow::Owned(_)) {
                log::warn!("input line is not valid UTF-8: {line:?}");
            }
            if self.execute(&line) == CommandResult::Quit {
                break;
            }
        }
        log::debug!("command loop finished");
        Ok(())
    }

    /// Execute commands in order, stopping early at `quit`.
    pub fn run_commands<I, S>(&mut self, commands: I) -> CommandResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for command in commands {
            if self.execute(command.as_ref()) == CommandResult::Quit {
                return CommandResult::Quit;
            }
        }
        CommandResult::Continue
    }

    /// Execute one command line.
    ///
    /// Failures are reported on the output; they never end the session.
    pub fn execute(&mut self, line: &str) -> CommandResult {
        let line = line.trim();
        log::debug!("> {line}");
        let Some(CommandLine { command, args }) = parse_uci_command(line) else {
            return CommandResult::Continue;
        };
        if command == UciCommand::Quit {
            return CommandResult::Quit;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(command, args)))
            .unwrap_or_else(|payload| {
                Err(anyhow!("command panicked: {}", panic_message(&*payload)))
            });
        if let Err(e) = outcome {
            log::warn!("'{line}' failed: {e:#}");
            self.report_fault(&e);
        }
        CommandResult::Continue
    }

    /// Write a fault dump for an unexpected error.
    pub fn report_fault(&self, err: &anyhow::Error) {
        self.out.lines(fault_dump(err));
    }

    /// Stop the running task and shut the background worker down.
    pub fn close(&mut self) {
        self.tasks.close();
    }

    fn dispatch(&mut self, command: UciCommand, args: VecDeque<String>) -> anyhow::Result<()> {
        match command {
            UciCommand::Uci => self.do_uci(),
            UciCommand::Debug => self.do_debug(&args),
            UciCommand::SetOption => self.do_set_option(&args),
            UciCommand::IsReady => self.out.line("readyok"),
            UciCommand::UciNewGame => self.engine.lock().new_game(),
            UciCommand::Position => return self.do_position(args),
            UciCommand::Go => return self.do_go(args),
            UciCommand::Stop => self.do_stop(),
            UciCommand::Engine => self.do_engine(&args),
            UciCommand::Perft => self.do_perft(args),
            UciCommand::Test => self.do_perf_stats(args),
            UciCommand::Display => self.do_display(&args),
            UciCommand::Quit => {}
            UciCommand::Unknown(_) => self.debug("unknown command"),
        }
        Ok(())
    }

    /// Emit a diagnostic; visible to the controller only in debug mode.
    fn debug(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        log::debug!("diagnostic: {message}");
        if self.debug_uci {
            self.out.line(format!("info string {message}"));
        }
    }

    fn do_uci(&self) {
        let engine = self.engine.lock();
        let mut lines = vec![format!("id name {}", self.engine_id)];
        if let Some(author) = engine.author() {
            lines.push(format!("id author {author}"));
        }
        drop(engine);
        lines.extend(self.options.iter().map(|o| o.to_uci()));
        lines.push("uciok".to_string());
        self.out.lines(lines);
    }

    fn do_debug(&mut self, args: &VecDeque<String>) {
        if args.len() != 1 {
            self.debug("Expected 1 argument to this command");
            return;
        }
        match args[0].as_str() {
            "on" => self.debug_uci = true,
            "off" => self.debug_uci = false,
            other => self.debug(format!("Wrong argument {other}")),
        }
    }

    fn do_set_option(&mut self, args: &VecDeque<String>) {
        if let Err(message) = self.set_option(args) {
            self.debug(message);
        }
    }

    fn set_option(&mut self, args: &VecDeque<String>) -> Result<(), String> {
        if args.len() < 2 {
            return Err("Missing name prefix or option name".to_string());
        }
        if args[0] != "name" {
            return Err("setoption command should start with name".to_string());
        }
        // Option names may contain spaces.
        let name = args
            .iter()
            .skip(1)
            .take_while(|t| *t != "value")
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let value = args
            .iter()
            .skip_while(|t| *t != "value")
            .skip(1)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            return Err("Option name is empty".to_string());
        }
        let option = self
            .options
            .get_mut(&name)
            .ok_or_else(|| "Unknown option".to_string())?;
        option
            .set_value((!value.is_empty()).then_some(value.as_str()))
            .map_err(|e: OptionError| {
                log::debug!("{e}");
                format!("Value {value} is illegal")
            })
    }

    fn do_position(&mut self, args: VecDeque<String>) -> anyhow::Result<()> {
        let mut tokens = args.into_iter();
        let first = tokens.next();
        let rest: Vec<String> = tokens.collect();
        let fen = match first.as_deref() {
            Some("startpos") => START_FEN.to_string(),
            Some("fen") => rest
                .iter()
                .take_while(|t| *t != "moves")
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            _ => {
                self.debug("invalid position definition");
                return Ok(());
            }
        };
        let moves = rest
            .iter()
            .skip_while(|t| *t != "moves")
            .skip(1)
            .map(|m| {
                m.parse::<UciMove>()
                    .with_context(|| format!("invalid move {m} in position command"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        log::debug!("setting position {fen} with {} move(s)", moves.len());
        self.position = None;
        let mut engine = self.engine.lock();
        engine.set_start_position(&fen)?;
        for mv in &moves {
            engine.apply_move(mv)?;
        }
        drop(engine);
        self.position = Some(PositionSpec { fen, moves });
        Ok(())
    }

    fn do_go(&mut self, args: VecDeque<String>) -> anyhow::Result<()> {
        if self.position.is_none() || !self.engine.lock().is_position_set() {
            self.debug(NO_POSITION_DEFINED);
            return Ok(());
        }
        let Some(params) = self.parse_params(&GO_PARSER, GoParameters::default(), args) else {
            return Ok(());
        };
        let task = self
            .engine
            .lock()
            .go(&params)
            .context("the engine cannot start searching")?;
        let stop = task.stop_flag();
        let out = self.out.clone();
        let started = self.tasks.submit(
            move || {
                let reply = task.get()?;
                out.lines(reply.to_uci_lines());
                Ok(())
            },
            stop_flag_cancel(stop),
        );
        if !started {
            self.debug(ENGINE_BUSY);
        }
        Ok(())
    }

    fn do_stop(&self) {
        if !self.tasks.request_stop() {
            self.debug("Nothing to stop");
        }
    }

    fn do_engine(&mut self, args: &VecDeque<String>) {
        let Some(id) = args.front() else {
            let mut lines = vec![format!("engine {}", self.engine_id)];
            lines.extend(
                self.engines
                    .iter()
                    .filter(|(id, _)| *id != self.engine_id)
                    .map(|(id, _)| format!("engine {id}")),
            );
            self.out.lines(lines);
            return;
        };
        if *id == self.engine_id {
            return;
        }
        if self.find_engine(id).is_none() {
            self.debug(format!("engine {id} is unknown"));
            return;
        }
        if self.position.is_some() {
            self.debug("position is cleared by engine change");
        }
        match self.select_engine(id) {
            Ok(()) => self.out.line(format!("engine {id} ok")),
            Err(e) => self.debug(e.to_string()),
        }
    }

    fn do_perft(&mut self, args: VecDeque<String>) {
        let Some(position) = self.position.clone() else {
            self.debug(NO_POSITION_DEFINED);
            return;
        };
        let Some(perft) = self.engine.lock().perft() else {
            self.debug("perft is not supported by this engine");
            return;
        };
        let Some(params) = self.parse_params(&PERFT_PARSER, PerftParameters::default(), args)
        else {
            return;
        };
        let task = LongRunningTask::new(move |stop| perft.divide(&position, &params, stop));
        let stop = task.stop_flag();
        let out = self.out.clone();
        let started = self.tasks.submit(
            move || {
                let start = Instant::now();
                let result = task.get()?;
                out.lines(report::perft_report(&result, &params, start.elapsed()));
                Ok(())
            },
            stop_flag_cancel(stop),
        );
        if !started {
            self.debug(ENGINE_BUSY);
        }
    }

    fn do_perf_stats(&mut self, args: VecDeque<String>) {
        let Some(perft) = self.engine.lock().perft() else {
            self.debug("test is not supported by this engine");
            return;
        };
        let Some(params) =
            self.parse_params(&PERF_STATS_PARSER, PerfStatsParameters::default(), args)
        else {
            return;
        };
        if self.perft_data.is_empty() {
            self.out.line("No test data available");
            self.debug("Use --perft-data to provide a test suite");
            return;
        }

        let data = Arc::clone(&self.perft_data);
        let out = self.out.clone();
        let task_out = self.out.clone();
        let settings = params.perft;
        let task = LongRunningTask::new(move |stop| {
            Ok(run_perf_stats(perft.as_ref(), &data, &settings, stop, &task_out))
        });
        let stop = task.stop_flag();
        let started = self.tasks.submit_with_stopper(
            move |stopper| {
                let timer = params
                    .cut_time_s
                    .map(|seconds| {
                        DeadlineTimer::start(Duration::from_secs(u64::from(seconds)), move || {
                            log::debug!("test cut after {seconds}s");
                            stopper.request_stop();
                        })
                    })
                    .transpose()
                    .context("cannot start the test timer")?;
                let start = Instant::now();
                let outcome = task.get();
                if let Some(timer) = timer {
                    timer.cancel();
                }
                let moves = outcome?;
                out.line(report::perf_stats_summary(moves, &settings, start.elapsed()));
                Ok(())
            },
            stop_flag_cancel(stop),
        );
        if !started {
            self.debug(ENGINE_BUSY);
        }
    }

    fn do_display(&self, args: &VecDeque<String>) {
        if self.position.is_none() {
            self.debug(NO_POSITION_DEFINED);
            return;
        }
        let engine = self.engine.lock();
        let rendered = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            [] => engine.board_as_string(),
            ["fen"] => engine.fen(),
            _ => {
                drop(engine);
                self.debug(format!("Unknown display options {}", bracketed(args)));
                return;
            }
        };
        drop(engine);
        match rendered {
            Some(text) => self.out.lines(text.lines()),
            None => self.debug("position display is not supported by this engine"),
        }
    }

    /// Parse command arguments, reporting problems as diagnostics.
    fn parse_params<T>(&self, parser: &Parser<T>, mut target: T, args: VecDeque<String>) -> Option<T> {
        let shown = bracketed(&args);
        let mut tokens = args;
        match parser.parse(&mut target, &mut tokens) {
            Ok(ignored) => {
                if !ignored.is_empty() {
                    self.debug(format!(
                        "The following parameters were ignored {}",
                        bracketed(&ignored)
                    ));
                }
                Some(target)
            }
            Err(e) => {
                log::debug!("argument error: {e}");
                self.debug(format!("There's an illegal argument in {shown}"));
                None
            }
        }
    }

    fn find_engine(&self, id: &str) -> Option<SharedEngine> {
        self.engines
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, engine)| Arc::clone(engine))
    }
}

fn bracketed<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let items: Vec<&str> = items.into_iter().map(String::as_str).collect();
    format!("[{}]", items.join(", "))
}

fn stop_flag_cancel(stop: StopFlag) -> CancelAction {
    Box::new(move || {
        stop.stop();
        Ok(())
    })
}

/// Run the perft suite, returning the number of generated moves.
///
/// Count mismatches and broken positions are reported as they are found.
fn run_perf_stats(
    perft: &dyn Perft,
    data: &[PerftTestData],
    params: &PerftParameters,
    stop: &StopFlag,
    out: &UciOutput,
) -> u64 {
    let mut moves = 0;
    for entry in data {
        if stop.is_stopped() {
            break;
        }
        let Some(expected) = entry.expected(params.depth) else {
            continue;
        };
        let position = PositionSpec {
            fen: entry.fen.clone(),
            moves: Vec::new(),
        };
        match perft.divide(&position, params, stop) {
            Ok(result) if result.interrupted => break,
            Ok(result) => {
                if result.leaves != expected {
                    out.line(report::count_error(&entry.fen, expected, result.leaves));
                }
                moves += result.moves_found;
            }
            Err(e) => {
                let e = anyhow::Error::new::<EngineError>(e)
                    .context(format!("test position {} failed", entry.fen));
                out.lines(fault_dump(&e));
            }
        }
    }
    moves
}

/// Options of `engine` followed by the automatic capability options.
fn build_options(engine: &SharedEngine) -> OptionTable {
    let (mut table, capabilities) = {
        let guard = engine.lock();
        (guard.options().into_iter().collect::<OptionTable>(), guard.capabilities())
    };

    if capabilities.chess960 {
        let target = Arc::clone(engine);
        add_automatic(
            &mut table,
            CheckOption::new(CHESS960_OPTION, false, move |enabled| {
                target.lock().set_chess960(*enabled);
            }),
        );
    }
    if let Some(default) = capabilities.own_book {
        let target = Arc::clone(engine);
        add_automatic(
            &mut table,
            CheckOption::new(OWN_BOOK_OPTION, default, move |enabled| {
                target.lock().set_own_book(*enabled);
            }),
        );
    }
    if let Some(default) = capabilities.default_hash_size {
        let target = Arc::clone(engine);
        add_automatic(
            &mut table,
            SpinOption::<u32>::new(HASH_OPTION, default, 1, MAX_HASH_SIZE_MB, move |size| {
                target.lock().set_hash_table_size(*size);
            }),
        );
    }
    table
}

fn add_automatic<O: UciOption + 'static>(table: &mut OptionTable, option: Result<O, OptionError>) {
    match option {
        Ok(option) => {
            let name = option.name().to_string();
            if !table.insert_if_absent(Box::new(option)) {
                log::debug!("engine declares its own {name} option");
            }
        }
        Err(e) => log::warn!("automatic option skipped: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Capabilities, GoReply};
    use crate::uci::print::OutputBuffer;

    struct Stub {
        id: &'static str,
        capabilities: Capabilities,
        positioned: bool,
    }

    impl Stub {
        fn new(id: &'static str) -> Self {
            Stub {
                id,
                capabilities: Capabilities::default(),
                positioned: false,
            }
        }
    }

    impl Engine for Stub {
        fn id(&self) -> &str {
            self.id
        }

        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }

        fn set_start_position(&mut self, _fen: &str) -> Result<(), EngineError> {
            self.positioned = true;
            Ok(())
        }

        fn apply_move(&mut self, _mv: &UciMove) -> Result<(), EngineError> {
            Ok(())
        }

        fn is_position_set(&self) -> bool {
            self.positioned
        }

        fn go(&mut self, _params: &GoParameters) -> Result<LongRunningTask<GoReply>, EngineError> {
            Ok(LongRunningTask::new(|_| Ok(GoReply::new(None))))
        }
    }

    fn session(engine: Stub) -> (Uci, OutputBuffer) {
        let (out, buffer) = UciOutput::buffer();
        let mut uci = Uci::new(engine, out).expect("session");
        uci.set_debug(true);
        (uci, buffer)
    }

    #[test]
    fn test_automatic_options_follow_capabilities() {
        let mut stub = Stub::new("stub");
        stub.capabilities = Capabilities {
            chess960: true,
            own_book: Some(true),
            default_hash_size: Some(16),
        };
        let (uci, _) = session(stub);
        let lines: Vec<String> = uci.options().iter().map(|o| o.to_uci()).collect();
        assert_eq!(
            lines,
            vec![
                "option name UCI_Chess960 type check default false",
                "option name OwnBook type check default true",
                "option name Hash type spin default 16 min 1 max 65536",
            ]
        );
    }

    #[test]
    fn test_hash_default_out_of_range_is_skipped() {
        let mut stub = Stub::new("stub");
        stub.capabilities.default_hash_size = Some(0);
        let (uci, _) = session(stub);
        assert!(uci.options().is_empty());
    }

    #[test]
    fn test_duplicate_engine_is_rejected() {
        let (mut uci, _) = session(Stub::new("stub"));
        assert!(uci.add_engine(Stub::new("other")).is_ok());
        assert!(matches!(
            uci.add_engine(Stub::new("other")),
            Err(UciError::DuplicateEngine(_))
        ));
        assert!(matches!(
            uci.select_engine("missing"),
            Err(UciError::UnknownEngine(_))
        ));
    }

    #[test]
    fn test_position_requires_known_keyword() {
        let (mut uci, buffer) = session(Stub::new("stub"));
        uci.execute("position");
        uci.execute("position somewhere");
        assert_eq!(
            buffer.lines(),
            vec![
                "info string invalid position definition",
                "info string invalid position definition"
            ]
        );
        assert!(!uci.is_position_set());
    }

    #[test]
    fn test_bad_move_leaves_position_unset() {
        let (mut uci, buffer) = session(Stub::new("stub"));
        uci.execute("position startpos moves e2e4 e7");
        assert!(!uci.is_position_set());
        assert!(buffer.contents().contains("invalid move e7"));
    }

    #[test]
    fn test_bracketed_list() {
        let items = vec!["a".to_string(), "b".to_string()];
        assert_eq!(bracketed(&items), "[a, b]");
        assert_eq!(bracketed(&Vec::<String>::new()), "[]");
    }
}
