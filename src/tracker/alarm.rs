use std::io::Write;
use std::time::Duration;

/// One beep followed by silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub on: Duration,
    pub off: Duration,
}

const fn tone(on_ms: u64, off_ms: u64) -> Tone {
    Tone {
        on: Duration::from_millis(on_ms),
        off: Duration::from_millis(off_ms),
    }
}

/// Sounded ahead of AOS.
pub const PASS_ALERT: [Tone; 3] = [tone(400, 150), tone(400, 150), tone(400, 150)];
/// Acknowledges the alert toggle.
pub const CLICK: [Tone; 1] = [tone(200, 0)];

pub trait Alarm: Send {
    /// Plays the pattern to completion.
    fn sound(&mut self, pattern: &[Tone]);
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Default)]
pub struct TerminalAlarm;

impl Alarm for TerminalAlarm {
    fn sound(&mut self, pattern: &[Tone]) {
        log::info!("Alarm: {} tone(s)", pattern.len());
        let mut stderr = std::io::stderr();
        for t in pattern {
            if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
                log::debug!("Bell not written: {}", e);
            }
            std::thread::sleep(t.on + t.off);
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingAlarm {
    pub patterns: std::sync::Arc<std::sync::Mutex<Vec<Vec<Tone>>>>,
}

#[cfg(test)]
impl Alarm for RecordingAlarm {
    fn sound(&mut self, pattern: &[Tone]) {
        self.patterns.lock().unwrap().push(pattern.to_vec());
    }
}
