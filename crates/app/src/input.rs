use exam_core::model::NavDirection;
use services::AttemptCommand;

/// One line typed by the student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(AttemptCommand),
    /// Install a fresh bearer token after signing in again.
    Token(String),
    Help,
    Quit,
    Unknown(String),
}

/// Parse a prompt line. Options are numbered from 1 on screen.
pub fn parse_line(line: &str, options: &[String]) -> Input {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(h, r)| (h, r.trim()));

    match head {
        "n" | "next" => Input::Command(AttemptCommand::Navigate(NavDirection::Next)),
        "p" | "prev" => Input::Command(AttemptCommand::Navigate(NavDirection::Previous)),
        "f" | "flag" => Input::Command(AttemptCommand::ToggleCurrentFlag),
        "s" | "submit" => Input::Command(AttemptCommand::Submit),
        "g" | "go" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Command(AttemptCommand::JumpTo(n - 1)),
            _ => Input::Unknown(line.to_owned()),
        },
        "token" if !rest.is_empty() => Input::Token(rest.to_owned()),
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" => Input::Quit,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => {
                Input::Command(AttemptCommand::AnswerCurrent(options[n - 1].clone()))
            }
            _ => Input::Unknown(line.to_owned()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Paris".into(), "Lyon".into()]
    }

    #[test]
    fn numbers_select_options() {
        assert_eq!(
            parse_line("2", &options()),
            Input::Command(AttemptCommand::AnswerCurrent("Lyon".into()))
        );
        assert!(matches!(parse_line("3", &options()), Input::Unknown(_)));
        assert!(matches!(parse_line("0", &options()), Input::Unknown(_)));
    }

    #[test]
    fn navigation_and_jump() {
        assert_eq!(
            parse_line(" next ", &options()),
            Input::Command(AttemptCommand::Navigate(NavDirection::Next))
        );
        assert_eq!(
            parse_line("g 4", &options()),
            Input::Command(AttemptCommand::JumpTo(3))
        );
        assert!(matches!(parse_line("g", &options()), Input::Unknown(_)));
    }

    #[test]
    fn token_requires_a_value() {
        assert_eq!(
            parse_line("token abc.def", &options()),
            Input::Token("abc.def".into())
        );
        assert!(matches!(parse_line("token", &options()), Input::Unknown(_)));
    }
}
