//! Input line parsing.
//!
//! Plain lines are messages. Lines starting with `/` are commands:
//!
//! | line                | effect                               |
//! |---------------------|--------------------------------------|
//! | `/add <id> <name>`  | add a user to the current group      |
//! | `/remove <id>`      | remove a user from the current group |
//! | `/members`          | print the visible roster             |
//! | `/refresh`          | fetch the roster from the directory  |
//! | `/quit`             | close the channel and exit           |
//!
//! A leading `//` escapes a message that starts with a slash.

use murmur_proto::{Member, WireId};
use thiserror::Error;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Post a message
    Message(String),
    /// Add a member
    Add(Member),
    /// Remove a member
    Remove(WireId),
    /// Print the roster
    Members,
    /// Refresh the roster from the directory
    Refresh,
    /// Exit
    Quit,
}

/// Malformed command line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Command not recognized
    #[error("unknown command /{0}")]
    UnknownCommand(String),

    /// Command given the wrong arguments
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Input>, InputError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    if let Some(escaped) = line.strip_prefix("//") {
        return Ok(Some(Input::Message(format!("/{escaped}"))));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(Input::Message(line.to_owned())));
    };

    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<_> = words.collect();

    let input = match (name, args.as_slice()) {
        ("add", [id, username]) => Input::Add(Member::new(wire_id(id), *username)),
        ("add", _) => return Err(InputError::Usage("/add <id> <name>")),
        ("remove", [id]) => Input::Remove(wire_id(id)),
        ("remove", _) => return Err(InputError::Usage("/remove <id>")),
        ("members", []) => Input::Members,
        ("refresh", []) => Input::Refresh,
        ("quit" | "exit", []) => Input::Quit,
        ("members" | "refresh" | "quit" | "exit", _) => {
            return Err(InputError::Usage("command takes no arguments"));
        },
        (other, _) => return Err(InputError::UnknownCommand(other.to_owned())),
    };
    Ok(Some(input))
}

/// Numeric ids become numbers on the wire, anything else stays text.
pub fn wire_id(raw: &str) -> WireId {
    raw.parse::<u64>().map_or_else(|_| WireId::from(raw), WireId::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(parse_line("hello there\n"), Ok(Some(Input::Message("hello there".into()))));
        assert_eq!(parse_line("   \n"), Ok(None));
        assert_eq!(parse_line("//shrug"), Ok(Some(Input::Message("/shrug".into()))));
    }

    #[test]
    fn commands_parse_arguments() {
        assert_eq!(parse_line("/add 4 dave"), Ok(Some(Input::Add(Member::new(4, "dave")))));
        assert_eq!(parse_line("/remove u-9"), Ok(Some(Input::Remove(WireId::from("u-9")))));
        assert_eq!(parse_line("/members"), Ok(Some(Input::Members)));
        assert_eq!(parse_line("/quit"), Ok(Some(Input::Quit)));
    }

    #[test]
    fn bad_commands_are_rejected() {
        assert_eq!(parse_line("/add 4"), Err(InputError::Usage("/add <id> <name>")));
        assert_eq!(parse_line("/dance"), Err(InputError::UnknownCommand("dance".into())));
        assert!(parse_line("/refresh now").is_err());
    }
}
