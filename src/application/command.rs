//! Subscriber command parsing.
//!
//! Signal commands (`/signal`, `/long`, ...) are handled by
//! [`crate::domain::parser`]; this module covers everything a subscriber
//! can type in a private chat.

/// Supported subscriber commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Start,
    Help,
    Status,
    Register,
    Cancel,
    Skip,
    /// `/setamount [usdt]`; the raw argument is validated by the caller.
    SetAmount(Option<String>),
    /// `/setleverage [n]`; the raw argument is validated by the caller.
    SetLeverage(Option<String>),
    Unregister,
    AdminStats,
}

/// Parse error for command messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    NotACommand,
    UnknownCommand(String),
}

impl std::fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotACommand => write!(f, "message is not a command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Parse a message into a subscriber command.
pub fn parse_command(text: &str) -> Result<UserCommand, CommandParseError> {
    let mut parts = text.split_whitespace();
    let Some(raw_command) = parts.next() else {
        return Err(CommandParseError::NotACommand);
    };
    if !raw_command.starts_with('/') {
        return Err(CommandParseError::NotACommand);
    }

    let command = raw_command
        .split_once('@')
        .map_or(raw_command, |(head, _)| head)
        .to_ascii_lowercase();
    let argument = parts.next().map(str::to_string);

    match command.as_str() {
        "/start" => Ok(UserCommand::Start),
        "/help" => Ok(UserCommand::Help),
        "/status" => Ok(UserCommand::Status),
        "/register" => Ok(UserCommand::Register),
        "/cancel" => Ok(UserCommand::Cancel),
        "/skip" => Ok(UserCommand::Skip),
        "/setamount" => Ok(UserCommand::SetAmount(argument)),
        "/setleverage" => Ok(UserCommand::SetLeverage(argument)),
        "/unregister" => Ok(UserCommand::Unregister),
        "/adminstats" => Ok(UserCommand::AdminStats),
        _ => Err(CommandParseError::UnknownCommand(command)),
    }
}

/// Bot commands for Telegram menu registration.
///
/// Returns tuples of (command, description) for `set_my_commands`. Admin
/// commands are left out of the public menu.
#[must_use]
pub fn bot_commands() -> Vec<(&'static str, &'static str)> {
    vec![
        ("start", "Welcome and subscription overview"),
        ("register", "Connect your Mudrex account"),
        ("status", "Show your subscription"),
        ("setamount", "Set the USDT amount per signal"),
        ("setleverage", "Set your maximum leverage"),
        ("unregister", "Stop receiving trades"),
        ("cancel", "Abort registration"),
        ("help", "Show all commands"),
    ]
}
