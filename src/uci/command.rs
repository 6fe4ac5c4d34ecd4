use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    Debug,
    SetOption,
    IsReady,
    UciNewGame,
    Position,
    Go,
    Stop,
    /// Select or list registered engines.
    Engine,
    Perft,
    /// Perft correctness and speed check over the configured suite.
    Test,
    /// Show the current position.
    Display,
    Quit,
    Unknown(String),
}

impl UciCommand {
    /// Keywords are case sensitive.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "uci" => UciCommand::Uci,
            "debug" => UciCommand::Debug,
            "setoption" => UciCommand::SetOption,
            "isready" => UciCommand::IsReady,
            "ucinewgame" | "ng" => UciCommand::UciNewGame,
            "position" => UciCommand::Position,
            "go" => UciCommand::Go,
            "stop" => UciCommand::Stop,
            "engine" => UciCommand::Engine,
            "perft" => UciCommand::Perft,
            "test" => UciCommand::Test,
            "d" => UciCommand::Display,
            "quit" | "q" => UciCommand::Quit,
            other => UciCommand::Unknown(other.to_string()),
        }
    }
}

/// A command keyword and the tokens that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub command: UciCommand,
    pub args: VecDeque<String>,
}

/// Split a line into its command and arguments; `None` for blank lines.
#[must_use]
pub fn parse_uci_command(line: &str) -> Option<CommandLine> {
    let mut tokens = line.split_whitespace().map(str::to_string);
    let keyword = tokens.next()?;
    Some(CommandLine {
        command: UciCommand::from_keyword(&keyword),
        args: tokens.collect(),
    })
}
