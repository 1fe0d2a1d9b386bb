//! Slash commands for interactive mode

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Clear the conversation
    Clear,
    /// Show a message to the user (not sent to the model)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command; `None` when `input` is a topic
pub fn execute_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let command = rest.split_whitespace().next().unwrap_or("").to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" | "reset" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Type a topic to get a short explanation and one multiple-choice question.

Available commands:
  /help, /h, /?        Show this help message
  /clear, /c           Clear chat memory
  /quit, /exit, /q     Exit examprep

Examples:
  Operating Systems Deadlocks
  Dijkstra's algorithm
  /clear               Start a fresh conversation"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(execute_command("Operating Systems Deadlocks"), None);
        assert_eq!(execute_command("what is a/b testing"), None);
    }

    #[test]
    fn test_clear_aliases() {
        for input in ["/clear", "/c", " /CLEAR ", "/reset"] {
            assert_eq!(execute_command(input), Some(CommandResult::Clear));
        }
    }

    #[test]
    fn test_quit_aliases() {
        for input in ["/quit", "/exit", "/q"] {
            assert_eq!(execute_command(input), Some(CommandResult::Exit));
        }
    }

    #[test]
    fn test_help_lists_commands() {
        let Some(CommandResult::Message(text)) = execute_command("/help") else {
            panic!("expected help text");
        };
        assert!(text.contains("/clear"));
        assert!(text.contains("/quit"));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            execute_command("/model gemini"),
            Some(CommandResult::Unknown("model".to_string()))
        );
        assert_eq!(execute_command("/"), Some(CommandResult::Unknown(String::new())));
    }
}
