//! Line commands read from stdin.

use fadetext_core::TimeUnit;
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  pause | resume | stop | restart
  shuffle | refresh | status
  jump <index>
  timeout <amount> [ms|s|min]
  texts <a>|<b>|<c>
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    Stop,
    Restart,
    Shuffle,
    Refresh,
    Status,
    JumpTo(usize),
    Timeout { amount: f64, unit: TimeUnit },
    Texts(Vec<String>),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, rest)| (name, rest.trim()));

        match name.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "shuffle" => Ok(Self::Shuffle),
            "refresh" => Ok(Self::Refresh),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "jump" => rest
                .parse()
                .map(Self::JumpTo)
                .map_err(|_| ParseError::Usage("jump <index>")),
            "timeout" => parse_timeout(rest),
            "texts" => Ok(Self::Texts(
                rest.split('|')
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

fn parse_timeout(rest: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "timeout <amount> [ms|s|min]";

    let mut parts = rest.split_whitespace();
    let amount = parts
        .next()
        .and_then(|amount| amount.parse::<f64>().ok())
        .ok_or(ParseError::Usage(USAGE))?;
    let unit = parts
        .next()
        .map_or(TimeUnit::Milliseconds, |unit| {
            unit.parse().unwrap_or_default()
        });
    if parts.next().is_some() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(Command::Timeout { amount, unit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!("pause".parse(), Ok(Command::Pause));
        assert_eq!("  RESUME ".parse(), Ok(Command::Resume));
        assert_eq!("exit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_jump() {
        assert_eq!("jump 3".parse(), Ok(Command::JumpTo(3)));
        assert_eq!(
            "jump".parse::<Command>(),
            Err(ParseError::Usage("jump <index>"))
        );
        assert_eq!(
            "jump -1".parse::<Command>(),
            Err(ParseError::Usage("jump <index>"))
        );
    }

    #[test]
    fn test_timeout_units() {
        assert_eq!(
            "timeout 2 s".parse(),
            Ok(Command::Timeout {
                amount: 2.0,
                unit: TimeUnit::Seconds
            })
        );
        assert_eq!(
            "timeout 1500".parse(),
            Ok(Command::Timeout {
                amount: 1500.0,
                unit: TimeUnit::Milliseconds
            })
        );
        assert!("timeout soon".parse::<Command>().is_err());
    }

    #[test]
    fn test_texts_split_on_pipes() {
        assert_eq!(
            "texts Hello | Bonjour |Hola".parse(),
            Ok(Command::Texts(vec![
                "Hello".to_string(),
                "Bonjour".to_string(),
                "Hola".to_string()
            ]))
        );
        assert_eq!("texts".parse(), Ok(Command::Texts(Vec::new())));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "dance".parse::<Command>(),
            Err(ParseError::Unknown("dance".to_string()))
        );
    }
}
