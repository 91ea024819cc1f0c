//! # Operator Console
//!
//! Parses lines typed on stdin into operator actions.
//!
//! Lines starting with `:` are console directives; anything else is sent to
//! the flight computer verbatim.
//!
//! ```text
//! :connect /dev/ttyUSB0   open the telemetry port
//! :ports                  list serial ports
//! :launch                 send LAUNCH
//! :abort                  send ABORT
//! :reset                  clear all series and the time offset
//! :help                   show this list
//! :quit                   exit
//! ARM                     send free text
//! ```

use crate::command::Command;

/// Directive summary printed by `:help`
pub const HELP: &str = "\
:connect <port>  open the telemetry port
:ports           list serial ports
:launch          send LAUNCH
:abort           send ABORT
:reset           clear all series and the time offset
:help            show this list
:quit            exit
<text>           send text as a command";

/// One parsed operator line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorAction {
    Connect(String),
    ListPorts,
    Send(Command),
    Reset,
    Help,
    Quit,
    /// Directive that could not be understood; never sent to the link
    Invalid(String),
}

impl OperatorAction {
    /// Parse one stdin line
    ///
    /// Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let Some(directive) = line.strip_prefix(':') else {
            return Command::from_operator_text(line).map(OperatorAction::Send);
        };

        let mut words = directive.split_whitespace();
        let name = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();

        let action = match (name.as_str(), arg) {
            ("connect", Some(port)) => OperatorAction::Connect(port.to_string()),
            ("connect", None) => OperatorAction::Invalid(":connect needs a port name".to_string()),
            ("ports", _) => OperatorAction::ListPorts,
            ("launch", _) => OperatorAction::Send(Command::Launch),
            ("abort", _) => OperatorAction::Send(Command::Abort),
            ("reset", _) => OperatorAction::Reset,
            ("help", _) => OperatorAction::Help,
            ("quit", _) | ("q", _) => OperatorAction::Quit,
            _ => OperatorAction::Invalid(format!("Unknown directive: {}", line)),
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_ignored() {
        assert_eq!(OperatorAction::parse(""), None);
        assert_eq!(OperatorAction::parse("  \r\n"), None);
    }

    #[test]
    fn test_free_text_becomes_custom_command() {
        assert_eq!(
            OperatorAction::parse("SET RATE 10\n"),
            Some(OperatorAction::Send(Command::Custom("SET RATE 10".to_string())))
        );
    }

    #[test]
    fn test_launch_and_abort_directives() {
        assert_eq!(
            OperatorAction::parse(":launch"),
            Some(OperatorAction::Send(Command::Launch))
        );
        assert_eq!(
            OperatorAction::parse(":ABORT"),
            Some(OperatorAction::Send(Command::Abort))
        );
    }

    #[test]
    fn test_connect_directive() {
        assert_eq!(
            OperatorAction::parse(":connect /dev/ttyUSB0"),
            Some(OperatorAction::Connect("/dev/ttyUSB0".to_string()))
        );
    }

    #[test]
    fn test_connect_without_port_is_invalid() {
        assert!(matches!(
            OperatorAction::parse(":connect"),
            Some(OperatorAction::Invalid(_))
        ));
    }

    #[test]
    fn test_other_directives() {
        assert_eq!(OperatorAction::parse(":ports"), Some(OperatorAction::ListPorts));
        assert_eq!(OperatorAction::parse(":reset"), Some(OperatorAction::Reset));
        assert_eq!(OperatorAction::parse(":help"), Some(OperatorAction::Help));
        assert_eq!(OperatorAction::parse(":quit"), Some(OperatorAction::Quit));
        assert_eq!(OperatorAction::parse(":q"), Some(OperatorAction::Quit));
    }

    #[test]
    fn test_unknown_directive_not_sent() {
        match OperatorAction::parse(":explode now") {
            Some(OperatorAction::Invalid(msg)) => assert!(msg.contains(":explode")),
            other => panic!("Expected Invalid, got: {:?}", other),
        }
    }

    #[test]
    fn test_bare_colon_is_invalid() {
        assert!(matches!(
            OperatorAction::parse(":"),
            Some(OperatorAction::Invalid(_))
        ));
    }
}
