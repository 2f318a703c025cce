//! The interactive menu of the command-line program.

use crate::model::Domain;
use std::fmt;

/// What the user asked for at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Transfer(Vec<Domain>),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not one of the options, enter a number from 1 to 5")]
pub struct InvalidChoice(pub String);

pub fn parse_choice(input: &str) -> Result<Choice, InvalidChoice> {
    match input.trim() {
        "1" => Ok(Choice::Transfer(vec![Domain::Subscriptions])),
        "2" => Ok(Choice::Transfer(vec![Domain::LikedVideos])),
        "3" => Ok(Choice::Transfer(vec![Domain::Playlists])),
        "4" => Ok(Choice::Transfer(Domain::ALL.to_vec())),
        "5" | "q" | "quit" | "exit" => Ok(Choice::Exit),
        other => Err(InvalidChoice(other.to_string())),
    }
}

/// The menu screen, naming the two connected channels.
pub struct Menu<'a> {
    pub source: &'a str,
    pub destination: &'a str,
}

impl fmt::Display for Menu<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Copying from \"{}\" to \"{}\"", self.source, self.destination)?;
        writeln!(f)?;
        writeln!(f, "  1) Subscriptions")?;
        writeln!(f, "  2) Liked videos")?;
        writeln!(f, "  3) Playlists")?;
        writeln!(f, "  4) Everything")?;
        writeln!(f, "  5) Exit")?;
        write!(f, "Choose an option: ")
    }
}
