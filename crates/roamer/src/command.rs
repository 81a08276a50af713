use std::path::PathBuf;

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Upload(PathBuf),
    History,
    Reset,
    Quit,
    Help,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Chat(line.to_owned());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "upload" if !arg.is_empty() => Command::Upload(PathBuf::from(arg)),
            "history" => Command::History,
            "reset" => Command::Reset,
            "quit" | "exit" => Command::Quit,
            "help" => Command::Help,
            _ => Command::Unknown(line.to_owned()),
        }
    }
}

pub const HELP: &str = "\
Type a message to chat. Commands:
  /upload <path>  add a PDF (e.g. an expense report) to the conversation
  /history        show the conversation so far
  /reset          forget the conversation, documents and map
  /quit           leave";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            Command::parse("  Where to in May?\n"),
            Command::Chat("Where to in May?".to_owned())
        );
        assert_eq!(
            Command::parse("/upload  reports/march expenses.pdf "),
            Command::Upload(PathBuf::from("reports/march expenses.pdf"))
        );
        assert_eq!(Command::parse("/history"), Command::History);
        assert_eq!(Command::parse("/reset"), Command::Reset);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("   "), Command::Empty);
        assert_eq!(
            Command::parse("/upload"),
            Command::Unknown("/upload".to_owned())
        );
        assert_eq!(
            Command::parse("/fly me"),
            Command::Unknown("/fly me".to_owned())
        );
    }
}
