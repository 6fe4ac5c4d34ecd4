use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use uci_frontend::config::UciConfig;
use uci_frontend::engines::{bundled_engines, MATERIAL_ENGINE_ID};
use uci_frontend::uci::print::UciOutput;
use uci_frontend::uci::{CommandResult, Uci};

/// A UCI front-end for the bundled chess engines.
#[derive(Parser, Debug)]
#[command(name = "uci_frontend", version, about)]
struct Args {
    /// Start with `debug on`
    #[arg(long, env = "UCI_DEBUG")]
    debug: bool,

    /// File of commands executed before reading standard input
    #[arg(long, env = "UCI_INIT_COMMANDS")]
    init_commands: Option<PathBuf>,

    /// EPD file of perft counts used by the `test` command
    #[arg(long, env = "UCI_PERFT_DATA")]
    perft_data: Option<PathBuf>,

    /// Engine selected at start
    #[arg(long, default_value = MATERIAL_ENGINE_ID)]
    engine: String,
}

impl From<Args> for UciConfig {
    fn from(args: Args) -> Self {
        UciConfig {
            debug: args.debug,
            init_commands: args.init_commands,
            perft_data: args.perft_data,
            engine: Some(args.engine),
        }
    }
}

fn build_session(config: &UciConfig) -> anyhow::Result<Uci> {
    let mut engines = bundled_engines().into_iter();
    let default_engine = engines.next().context("no engine is bundled")?;
    let mut uci = Uci::with_shared_engine(default_engine, UciOutput::stdout())?;
    for engine in engines {
        uci.add_shared_engine(engine)?;
    }
    if let Some(id) = &config.engine {
        uci.select_engine(id)?;
    }
    uci.set_debug(config.debug);
    Ok(uci)
}

fn run() -> anyhow::Result<()> {
    let config = UciConfig::from(Args::parse());
    let mut uci = build_session(&config)?;

    match config.read_perft_data() {
        Ok(data) => uci.set_perft_data(data),
        Err(e) => uci.report_fault(&e.into()),
    }
    let commands = config.read_init_commands().unwrap_or_else(|e| {
        uci.report_fault(&e.into());
        Vec::new()
    });
    if uci.run_commands(commands) == CommandResult::Continue {
        uci.run(io::stdin().lock())?;
    }
    uci.close();
    Ok(())
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
