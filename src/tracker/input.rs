use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

use crate::display::InputEvent;

/// `n` or an empty line advances the page, `a` toggles the pass alert.
pub fn parse_command(line: &str) -> Option<InputEvent> {
    match line.trim() {
        "" | "n" | "next" => Some(InputEvent::Advance),
        "a" | "alert" => Some(InputEvent::ToggleAlert),
        _ => None,
    }
}

/// Feeds operator commands typed on stdin into the control loop.
pub fn spawn_stdin_reader(tx: Sender<InputEvent>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin-input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("Stopped reading stdin: {}", e);
                        return;
                    }
                };
                match parse_command(&line) {
                    Some(event) => {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                    None => log::warn!("Unknown command '{}' (n: next page, a: toggle alert)", line.trim()),
                }
            }
            log::debug!("stdin closed");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands() {
        assert_eq!(parse_command("\n"), Some(InputEvent::Advance));
        assert_eq!(parse_command(" n "), Some(InputEvent::Advance));
        assert_eq!(parse_command("a"), Some(InputEvent::ToggleAlert));
        assert_eq!(parse_command("x"), None);
    }
}
