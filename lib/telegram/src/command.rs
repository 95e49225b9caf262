//! Routing of incoming text.

/// Label of the keyboard button that clears the conversation.
pub const RESET_BUTTON: &str = "RESET";

/// A slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/reset`
    Reset,
    /// Any other command, by name.
    Unknown(String),
}

impl Command {
    /// Parses a slash command, ignoring a `@botname` suffix and arguments.
    ///
    /// Returns `None` if `text` is not a command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let word = rest.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default().to_lowercase();

        Some(match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "reset" => Self::Reset,
            _ => Self::Unknown(name),
        })
    }
}

/// What an incoming text message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming<'a> {
    /// A slash command.
    Command(Command),
    /// The reset keyboard button was pressed.
    ResetButton,
    /// A question for the model.
    Question(&'a str),
}

impl<'a> Incoming<'a> {
    /// Classifies a text message.
    #[must_use]
    pub fn route(text: &'a str) -> Self {
        if text.trim() == RESET_BUTTON {
            return Self::ResetButton;
        }
        match Command::parse(text) {
            Some(command) => Self::Command(command),
            None => Self::Question(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/reset"), Some(Command::Reset));
    }

    #[test]
    fn ignores_bot_suffix_and_arguments() {
        assert_eq!(Command::parse("/reset@visage_bot"), Some(Command::Reset));
        assert_eq!(Command::parse("/START now please"), Some(Command::Start));
    }

    #[test]
    fn unknown_commands_keep_their_name() {
        assert_eq!(
            Command::parse("/weather tomorrow"),
            Some(Command::Unknown("weather".to_string()))
        );
        assert_eq!(Command::parse("/"), Some(Command::Unknown(String::new())));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("How do I hide dark circles?"), None);
        assert_eq!(Command::parse("50/50 blend?"), None);
    }

    #[test]
    fn routes_reset_button() {
        assert_eq!(Incoming::route("RESET"), Incoming::ResetButton);
        assert_eq!(Incoming::route("reset"), Incoming::Question("reset"));
    }

    #[test]
    fn routes_questions_and_commands() {
        assert_eq!(
            Incoming::route("What helps dark circles?"),
            Incoming::Question("What helps dark circles?")
        );
        assert_eq!(Incoming::route("/help"), Incoming::Command(Command::Help));
    }
}
