//! BBS command grammar.
//!
//! ```text
//! login
//! help
//! msg  CALLSIGN text...        (alias: send)
//! group create NAME
//! group join   NAME
//! group leave  NAME
//! group msg    NAME text...
//! ```
//!
//! Keywords are case-insensitive. Message text keeps its inner spacing.

use aprsbbs_groups::{GroupError, GroupName};
use aprsbbs_protocol::Identity;

/// The single reply to `help`. Fits one message frame.
pub const HELP_TEXT: &str = "Cmds: login, help, msg CALL text, group create/join/leave/msg NAME";

const MSG_USAGE: &str = "msg CALLSIGN message";
const GROUP_USAGE: &str = "group create/join/leave/msg NAME [text]";

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Deliver everything waiting in the sender's mailbox.
    Login,
    Help,
    /// Store a private message for `recipient`.
    Msg { recipient: Identity, text: String },
    Group(GroupCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupCommand {
    Create(GroupName),
    Join(GroupName),
    Leave(GroupName),
    Msg { name: GroupName, text: String },
}

/// Why a message body is not a command. `Display` is the reply text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Blank body. Ignored without a reply.
    #[error("empty command")]
    Empty,

    #[error("Usage: {0}")]
    MissingArgument(&'static str),

    #[error("Unknown command. Try 'help'.")]
    UnknownCommand(String),

    #[error("Invalid callsign '{0}'.")]
    InvalidCallsign(String),

    #[error(transparent)]
    Group(#[from] GroupError),
}

impl Command {
    /// Parses one message body.
    pub fn parse(body: &str) -> Result<Command, CommandError> {
        let (keyword, rest) = split_word(body);
        if keyword.is_empty() {
            return Err(CommandError::Empty);
        }

        match keyword.to_ascii_lowercase().as_str() {
            "login" => Ok(Command::Login),
            "help" => Ok(Command::Help),
            "msg" | "send" => {
                let (callsign, text) = split_word(rest);
                if callsign.is_empty() || text.is_empty() {
                    return Err(CommandError::MissingArgument(MSG_USAGE));
                }
                let recipient = Identity::new(callsign)
                    .map_err(|_| CommandError::InvalidCallsign(callsign.to_string()))?;
                Ok(Command::Msg {
                    recipient,
                    text: text.to_string(),
                })
            }
            "group" => parse_group(rest).map(Command::Group),
            _ => Err(CommandError::UnknownCommand(keyword.to_string())),
        }
    }
}

fn parse_group(args: &str) -> Result<GroupCommand, CommandError> {
    let (action, rest) = split_word(args);
    let (name, text) = split_word(rest);
    if name.is_empty() {
        return Err(CommandError::MissingArgument(GROUP_USAGE));
    }

    let action = action.to_ascii_lowercase();
    match action.as_str() {
        "create" => Ok(GroupCommand::Create(GroupName::new(name)?)),
        "join" => Ok(GroupCommand::Join(GroupName::new(name)?)),
        "leave" => Ok(GroupCommand::Leave(GroupName::new(name)?)),
        "msg" | "send" => {
            if text.is_empty() {
                return Err(CommandError::MissingArgument(GROUP_USAGE));
            }
            Ok(GroupCommand::Msg {
                name: GroupName::new(name)?,
                text: text.to_string(),
            })
        }
        _ => Err(CommandError::MissingArgument(GROUP_USAGE)),
    }
}

/// Splits off the first whitespace-delimited word.
///
/// Returns `("", "")` for blank input; `rest` has no leading or trailing
/// whitespace.
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}
