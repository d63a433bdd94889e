//! Console: the terminal presentation layer for one chat session.
//!
//! ARCHITECTURE
//! ============
//! One loop selects over stdin lines and session events. Lines are parsed
//! into commands or chat input; events are rendered as they arrive, so
//! replies resolved in the background print without blocking the prompt.
//! The transcript is printed to stdout; logs go to stderr.

pub mod render;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::session::{SessionCoordinator, SessionEvent};

use render::ConsoleInput;

/// Run the chat console until `/quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
pub async fn run(session: SessionCoordinator) -> std::io::Result<()> {
    let mut events = session.events();
    session.initialize();
    println!("{}", render::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(mut line) = line? else {
                    debug!("console: end of input");
                    break;
                };
                if !handle_line(&session, &mut line).await {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "console: event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.release_voice();
    Ok(())
}

/// Returns `false` when the console should exit.
async fn handle_line(session: &SessionCoordinator, line: &mut String) -> bool {
    match render::parse_input(line) {
        ConsoleInput::Text(_) => {
            // Accepted input echoes back through the `Appended` event.
            let _ = session.submit_input(line);
        }
        ConsoleInput::Voice => session.toggle_voice(),
        ConsoleInput::Laws(query) => {
            let laws = match query {
                Some(q) => session.search_laws(&q).await,
                None => session.all_laws().await,
            };
            if laws.is_empty() {
                println!("{}", render::NO_LAWS);
            }
            for law in &laws {
                println!("{}", render::render_law(law));
            }
        }
        ConsoleInput::AddLaw(law) => match session.add_law(&law).await {
            Some(id) => println!("saved law #{id}"),
            None => println!("{}", render::render_notice("could not save law")),
        },
        ConsoleInput::DeleteLaw(id) => {
            let existing = session.all_laws().await.into_iter().find(|law| law.id == id);
            let Some(law) = existing else {
                println!("{}", render::render_notice(&format!("no law with id {id}")));
                return true;
            };
            if session.remove_law(&law).await > 0 {
                println!("deleted law #{id}");
            } else {
                println!("{}", render::render_notice("could not delete law"));
            }
        }
        ConsoleInput::Usage(usage) => println!("{usage}"),
        ConsoleInput::Help => println!("{}", render::HELP),
        ConsoleInput::Quit => return false,
        ConsoleInput::Unknown(name) => println!("Unknown command /{name}. Type /help for commands."),
    }
    true
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Appended(message) => println!("{}", render::render_message(message)),
        SessionEvent::ListeningChanged(listening) => println!("{}", render::render_listening(*listening)),
        SessionEvent::Notice(notice) => println!("{}", render::render_notice(notice)),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
