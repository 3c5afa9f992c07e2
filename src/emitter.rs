//! Terminal front end for transcript snapshots.

use relayhub_protocols::{EventEmitter, TranscriptEntry};

/// Prints the newest transcript entry of every snapshot to stdout.
pub(crate) struct TerminalEmitter;

impl TerminalEmitter {
    fn render(payload: &str) -> String {
        match serde_json::from_str::<Vec<TranscriptEntry>>(payload) {
            Ok(entries) => match entries.last() {
                Some(entry) => format!("[{}] {}", entry.timestamp, entry.payload),
                None => String::new(),
            },
            Err(_) => payload.to_string(),
        }
    }
}

impl EventEmitter for TerminalEmitter {
    fn emit(&self, _event: &str, payload: &str) {
        let line = Self::render(payload);
        if !line.is_empty() {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_newest_entry() {
        let payload = r#"[{"time":"t0","date":"a:1"},{"time":"t1","date":"b:2"}]"#;
        assert_eq!(TerminalEmitter::render(payload), "[t1] b:2");
    }

    #[test]
    fn test_render_empty_and_invalid() {
        assert_eq!(TerminalEmitter::render("[]"), "");
        assert_eq!(TerminalEmitter::render("not json"), "not json");
    }
}
