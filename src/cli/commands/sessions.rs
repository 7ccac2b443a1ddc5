//! Sessions command implementation.

use crate::cli::{Output, SessionsAction};
use crate::config::Settings;
use crate::session::SessionStore;
use anyhow::Result;

/// Run the sessions command.
pub fn run_sessions(action: &SessionsAction, settings: &Settings) -> Result<()> {
    let store = SessionStore::new(settings.sessions_dir());

    match action {
        SessionsAction::List => {
            let names = store.list()?;
            if names.is_empty() {
                Output::info("No saved sessions.");
                Output::info("Create one with: youtubot ingest <URL> --name <NAME>");
                return Ok(());
            }

            Output::header(&format!("Saved sessions ({})", names.len()));
            for name in &names {
                match store.load(name) {
                    Ok(knowledge) => {
                        let titles: Vec<&str> = knowledge.videos.iter().map(|v| v.title.as_str()).collect();
                        Output::list_item(&format!(
                            "{} - {} passages: {}",
                            name,
                            knowledge.index.len(),
                            titles.join(", ")
                        ));
                    }
                    Err(e) => Output::list_item(&format!("{} (unreadable: {})", name, e)),
                }
            }
        }

        SessionsAction::Delete { name } => {
            if store.delete(name)? {
                Output::success(&format!("Deleted session '{}'", name));
            } else {
                Output::warning(&format!("No session named '{}'", name));
            }
        }
    }

    Ok(())
}
