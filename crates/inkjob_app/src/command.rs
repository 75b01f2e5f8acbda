/// One line of input in an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(String),
    Download(Option<String>),
    Reset,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "commands: upload <path> | download [path] | reset | status | help | quit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        match word.to_ascii_lowercase().as_str() {
            "upload" | "u" => argument
                .map(Command::Upload)
                .ok_or_else(|| "upload needs a path".to_string()),
            "download" | "d" => Ok(Command::Download(argument)),
            "reset" | "r" => Ok(Command::Reset),
            "status" | "s" | "" => Ok(Command::Status),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command {other:?}; {HELP}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_keep_inner_spaces() {
        assert_eq!(
            Command::parse("upload  my photos/cat.png "),
            Ok(Command::Upload("my photos/cat.png".to_string()))
        );
    }

    #[test]
    fn download_path_is_optional() {
        assert_eq!(Command::parse("download"), Ok(Command::Download(None)));
        assert_eq!(
            Command::parse("d out.png"),
            Ok(Command::Download(Some("out.png".to_string())))
        );
    }

    #[test]
    fn upload_without_path_is_an_error() {
        assert!(Command::parse("upload").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[test]
    fn blank_line_shows_status() {
        assert_eq!(Command::parse("   "), Ok(Command::Status));
        assert_eq!(Command::parse("QUIT"), Ok(Command::Quit));
    }
}
