//! Slash commands typed into the input line.
use chatline_core::history::RecordId;
use thiserror::Error;

pub const HELP: &str = "\
/clear         clear the current chat
/new           start a new chat
/retry         ask again for the last answer
/history       list saved chats
/load <id>     continue a saved chat
/export        print the chat as Markdown
/download      save the chat as a JSON file
/help          show this help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clear,
    New,
    Retry,
    History,
    Load(RecordId),
    Export,
    Download,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`, try /help")]
    UnknownCommand(String),

    #[error("`{command}` needs an argument: {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("`{0}` is not a chat id")]
    InvalidId(String),
}

impl Command {
    /// Parse a line of input.
    ///
    /// Returns `None` when the line is not a command at all, so it can be
    /// sent as a message instead.
    pub fn parse(input: &str) -> Option<Result<Command, CommandError>> {
        let input = input.trim();
        let rest = input.strip_prefix('/')?;

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "clear" => Ok(Command::Clear),
            "new" => Ok(Command::New),
            "retry" => Ok(Command::Retry),
            "history" => Ok(Command::History),
            "export" => Ok(Command::Export),
            "download" => Ok(Command::Download),
            "help" => Ok(Command::Help),
            "load" if arg.is_empty() => Err(CommandError::MissingArgument {
                command: "/load",
                expected: "a chat id from /history",
            }),
            "load" => arg
                .parse()
                .map(Command::Load)
                .map_err(|_| CommandError::InvalidId(arg.to_owned())),
            _ => Err(CommandError::UnknownCommand(format!("/{name}"))),
        };
        Some(command)
    }
}
