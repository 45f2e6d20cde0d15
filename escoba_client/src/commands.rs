use escoba::game::CardId;
use std::fmt;

/// A line typed at the console, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Create a match against another player.
    Create(String),
    /// Create a match against the built-in bot.
    Quick,
    /// Join an existing match by id.
    Join(String),
    /// Play a card by its id.
    Play(CardId),
    Leave,
    Dismiss,
    Rematch,
    Refresh,
    Status,
    /// Show a player's profile, the local player's by default.
    Profile(Option<String>),
    /// Show a player's match history, the local player's by default.
    History(Option<String>),
    /// List the 40 cards with their ids.
    Cards,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Command needs an argument that wasn't given.
    MissingArgument {
        command: &'static str,
        usage: &'static str,
    },
    /// Card id is not a number.
    InvalidCardId(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument { command, usage } => {
                write!(f, "'{command}' needs an argument (e.g., '{usage}')")
            }
            Self::InvalidCardId(value) => write!(
                f,
                "Invalid card '{value}'. Use the number shown next to the card (e.g., 'play 18')"
            ),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{cmd}'. Type 'help' to see available commands"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
Commands:
  new NAME        Create a match against NAME
  quick           Create a match against the bot
  join ID         Join match ID
  play CARD       Play the card with number CARD from your hand
  refresh         Fetch the match state now
  status          Show the current match
  leave           Leave the current match
  dismiss         Close a finished match
  rematch         Play the same opponent again
  profile [NAME]  Show a player's profile
  history [NAME]  Show a player's finished matches
  cards           List all cards and their numbers
  help            Show this help
  quit            Exit
";

/// Parse a console line into a [`ConsoleCommand`].
///
/// # Examples
///
/// ```
/// use escoba_client::commands::{ConsoleCommand, parse_command};
///
/// assert_eq!(parse_command("play 18"), Ok(ConsoleCommand::Play(18)));
/// assert_eq!(parse_command("new bob"), Ok(ConsoleCommand::Create("bob".to_string())));
/// assert_eq!(parse_command("quick"), Ok(ConsoleCommand::Quick));
/// ```
pub fn parse_command(input: &str) -> Result<ConsoleCommand, ParseError> {
    let trimmed = input.trim();
    let mut parts = trimmed.split_ascii_whitespace();
    let Some(head) = parts.next() else {
        return Err(ParseError::UnrecognizedCommand(String::new()));
    };
    let argument = parts.next();

    let command = match head.to_ascii_lowercase().as_str() {
        "new" | "create" => ConsoleCommand::Create(required(argument, "new", "new bob")?),
        "quick" | "bot" => ConsoleCommand::Quick,
        "join" => ConsoleCommand::Join(required(argument, "join", "join m1")?),
        "play" | "p" => {
            let value = required(argument, "play", "play 18")?;
            let card_id = value
                .parse::<CardId>()
                .map_err(|_| ParseError::InvalidCardId(value))?;
            ConsoleCommand::Play(card_id)
        }
        "leave" => ConsoleCommand::Leave,
        "dismiss" | "close" => ConsoleCommand::Dismiss,
        "rematch" => ConsoleCommand::Rematch,
        "refresh" | "r" => ConsoleCommand::Refresh,
        "status" | "s" => ConsoleCommand::Status,
        "profile" => ConsoleCommand::Profile(argument.map(str::to_string)),
        "history" => ConsoleCommand::History(argument.map(str::to_string)),
        "cards" => ConsoleCommand::Cards,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        _ => return Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    };

    Ok(command)
}

fn required(
    argument: Option<&str>,
    command: &'static str,
    usage: &'static str,
) -> Result<String, ParseError> {
    argument
        .map(str::to_string)
        .ok_or(ParseError::MissingArgument { command, usage })
}
