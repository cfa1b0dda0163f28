//! Plain text terminal output.
use std::io::{self, Write};

use chip8::{constants::*, Devices, KeyState};

/// Renders frames as text to stdout.
///
/// There is no keyboard capture; the configured keys are reported as held for the whole run.
pub struct TermDevices {
    held_keys: KeyState,
    frame: String,
}

impl TermDevices {
    pub fn new(held_keys: KeyState) -> Self {
        Self {
            held_keys,
            frame: String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT),
        }
    }
}

/// Ring the terminal bell, flushing so it sounds immediately.
pub fn write_bell(out: &mut impl Write) -> io::Result<()> {
    out.write_all(b"\x07")?;
    out.flush()
}

/// Draw the display buffer as rows of `#` and `.`.
pub fn format_frame(buf: &mut String, pixels: &[u8; DISPLAY_BUFFER_SIZE]) {
    buf.clear();
    for row in pixels.chunks(DISPLAY_WIDTH) {
        buf.extend(row.iter().map(|px| if *px != 0 { '#' } else { '.' }));
        buf.push('\n');
    }
}

impl Devices for TermDevices {
    fn render_frame(&mut self, pixels: &[u8; DISPLAY_BUFFER_SIZE]) {
        format_frame(&mut self.frame, pixels);

        let mut stdout = io::stdout().lock();
        // Cursor home, so frames overwrite each other.
        if let Err(err) = write!(stdout, "\x1B[H{}", self.frame).and_then(|_| stdout.flush()) {
            log::warn!("failed to render frame: {err}");
        }
    }

    fn poll_input(&mut self) -> KeyState {
        self.held_keys
    }

    fn play_tone(&mut self) {
        log::info!("beep");
        if let Err(err) = write_bell(&mut io::stdout().lock()) {
            log::warn!("failed to play tone: {err}");
        }
    }
}
