//! Pure text rendering and input parsing for the console.

use crate::services::laws::{LawRecord, NewLaw};
use crate::session::{ChatMessage, Origin};

pub const HELP: &str = "\
Type a question and press Enter.
  /voice          start or stop voice input
  /laws [query]   list saved laws, or search by title or category
  /addlaw title | category | description [| link]
                  save a law to the local catalog
  /dellaw <id>    remove a saved law
  /help           show this help
  /quit           exit";

pub const NO_LAWS: &str = "No laws found.";
pub const ADD_LAW_USAGE: &str = "Usage: /addlaw title | category | description [| link]";
pub const DELETE_LAW_USAGE: &str = "Usage: /dellaw <id>";

/// One line of console input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Text(String),
    Voice,
    Laws(Option<String>),
    AddLaw(NewLaw),
    DeleteLaw(i64),
    /// Recognized command with malformed arguments.
    Usage(&'static str),
    Help,
    Quit,
    Unknown(String),
}

#[must_use]
pub fn parse_input(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ConsoleInput::Text(line.to_owned());
    };
    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    match name {
        "voice" => ConsoleInput::Voice,
        "laws" => {
            let query = rest.trim();
            ConsoleInput::Laws((!query.is_empty()).then(|| query.to_owned()))
        }
        "addlaw" => parse_new_law(rest).map_or(ConsoleInput::Usage(ADD_LAW_USAGE), ConsoleInput::AddLaw),
        "dellaw" => rest
            .trim()
            .parse()
            .map_or(ConsoleInput::Usage(DELETE_LAW_USAGE), ConsoleInput::DeleteLaw),
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        other => ConsoleInput::Unknown(other.to_owned()),
    }
}

/// `title | category | description [| link]`. The first three are required.
fn parse_new_law(args: &str) -> Option<NewLaw> {
    let mut fields = args.split('|').map(str::trim);
    let mut required = || fields.next().filter(|f| !f.is_empty()).map(str::to_owned);
    let title = required()?;
    let category = required()?;
    let description = required()?;
    let reference_link = fields.next().filter(|f| !f.is_empty()).map(str::to_owned);
    Some(NewLaw { id: None, title, category, description, reference_link })
}

#[must_use]
pub fn speaker(origin: Origin) -> &'static str {
    match origin {
        Origin::User => "You",
        Origin::Assistant => "LawAssist",
    }
}

/// `[HH:MM] Speaker: content`, time in UTC.
#[must_use]
pub fn render_message(message: &ChatMessage) -> String {
    format!(
        "[{:02}:{:02}] {}: {}",
        message.created_at.hour(),
        message.created_at.minute(),
        speaker(message.origin),
        message.content
    )
}

#[must_use]
pub fn render_law(law: &LawRecord) -> String {
    let mut out = format!("#{} {} [{}]\n    {}", law.id, law.title, law.category, law.description);
    if let Some(link) = law.reference_link.as_deref().filter(|l| !l.is_empty()) {
        out.push_str("\n    ");
        out.push_str(link);
    }
    out
}

#[must_use]
pub fn render_listening(listening: bool) -> &'static str {
    if listening { "Listening..." } else { "Stopped listening" }
}

#[must_use]
pub fn render_notice(notice: &str) -> String {
    format!("! {notice}")
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
