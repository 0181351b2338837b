use std::collections::HashMap;
use std::env;
use std::io::{self, IsTerminal, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use log::{debug, warn};

use crate::error::MosaicError;
use crate::event_source::{EventSource, KeyboardEventSource, wait_for_key_press};
use crate::palette::ColorPair;

/// The glyph every patch is drawn with.
pub const BLOCK_GLYPH: char = '█';

/// Fewest colors and color pairs a terminal must offer.
pub const MIN_COLORS: u32 = 8;

/// The terminal-facing half of a preview session.
pub trait TerminalControl {
    fn capabilities(&self) -> TerminalCapabilities;

    /// Must be called for a pair before any glyph uses it.
    fn register_color_pair(&mut self, pair: ColorPair) -> io::Result<()>;

    /// Writes one block glyph in the style of `pair_index`, then resets the
    /// style.
    fn emit_glyph(&mut self, pair_index: u16) -> io::Result<()>;

    fn emit_row_terminator(&mut self) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Blocks until the user presses a key.
    fn await_acknowledgment(&mut self) -> io::Result<()>;

    /// Restores the terminal. Calling it more than once is harmless.
    fn teardown(&mut self) -> io::Result<()>;
}

#[derive(Clone, Debug)]
pub struct TerminalEnv {
    pub term: String,
    pub colorterm: String,
    pub is_tty: bool,
}

impl TerminalEnv {
    pub fn read() -> Self {
        let term = env::var("TERM")
            .ok()
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        let colorterm = env::var("COLORTERM")
            .ok()
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        Self {
            term,
            colorterm,
            is_tty: io::stdout().is_terminal(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminalCapabilities {
    pub has_colors: bool,
    pub colors: u32,
    pub color_pairs: u32,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        Self::from_env(&TerminalEnv::read())
    }

    pub fn from_env(env: &TerminalEnv) -> Self {
        let has_colors = env.is_tty && !env.term.is_empty() && env.term != "dumb";
        let colors = if !has_colors {
            0
        } else if supports_true_color_env(env) {
            1 << 24
        } else if env.term.contains("256color") {
            256
        } else {
            8
        };

        Self {
            has_colors,
            colors,
            color_pairs: colors,
        }
    }

    /// Fails when the terminal cannot show `min` distinct colors.
    pub fn check(&self, min: u32) -> Result<(), MosaicError> {
        if !self.has_colors {
            return Err(MosaicError::unsupported_terminal(
                "Your terminal does not support color",
            ));
        }
        if self.colors < min || self.color_pairs < min {
            return Err(MosaicError::unsupported_terminal(format!(
                "Your terminal does not support at least {min} colors and color pairs"
            )));
        }
        Ok(())
    }
}

fn supports_true_color_env(env: &TerminalEnv) -> bool {
    env.colorterm == "truecolor"
        || env.colorterm == "24bit"
        || env.term.contains("truecolor")
        || env.term.contains("24bit")
}

/// Terminal color number for a palette index. The first eight use the
/// classic SGR colors so they work on 8-color terminals.
pub fn terminal_color(index: usize) -> Color {
    match index {
        0 => Color::Black,
        1 => Color::DarkRed,
        2 => Color::DarkGreen,
        3 => Color::DarkYellow,
        4 => Color::DarkBlue,
        5 => Color::DarkMagenta,
        6 => Color::DarkCyan,
        7 => Color::Grey,
        n => Color::AnsiValue(n.min(u8::MAX as usize) as u8),
    }
}

#[derive(Clone, Copy, Debug)]
struct PairStyle {
    foreground: Color,
    background: Color,
}

/// Crossterm-backed terminal. Nothing touches the real terminal until
/// [`CrosstermTerminal::start`]; dropping the value tears the session down.
pub struct CrosstermTerminal<W: Write, E: EventSource> {
    out: W,
    events: E,
    capabilities: TerminalCapabilities,
    pairs: HashMap<u16, PairStyle>,
    raw_mode: bool,
    alternate_screen: bool,
}

impl CrosstermTerminal<io::Stdout, KeyboardEventSource> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), KeyboardEventSource, TerminalCapabilities::detect())
    }
}

impl<W: Write, E: EventSource> CrosstermTerminal<W, E> {
    pub fn new(out: W, events: E, capabilities: TerminalCapabilities) -> Self {
        Self {
            out,
            events,
            capabilities,
            pairs: HashMap::new(),
            raw_mode: false,
            alternate_screen: false,
        }
    }

    /// Switches to the alternate screen in raw mode with a hidden cursor.
    pub fn start(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        self.raw_mode = true;
        execute!(
            self.out,
            EnterAlternateScreen,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        self.alternate_screen = true;
        debug!("Terminal session started");
        Ok(())
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write, E: EventSource> TerminalControl for CrosstermTerminal<W, E> {
    fn capabilities(&self) -> TerminalCapabilities {
        self.capabilities
    }

    fn register_color_pair(&mut self, pair: ColorPair) -> io::Result<()> {
        self.pairs.insert(
            pair.pair_index,
            PairStyle {
                foreground: terminal_color(pair.color_index),
                background: terminal_color(pair.background_index),
            },
        );
        Ok(())
    }

    fn emit_glyph(&mut self, pair_index: u16) -> io::Result<()> {
        let Some(style) = self.pairs.get(&pair_index).copied() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("color pair {pair_index} was never registered"),
            ));
        };
        queue!(
            self.out,
            SetForegroundColor(style.foreground),
            SetBackgroundColor(style.background),
            Print(BLOCK_GLYPH),
            ResetColor
        )
    }

    fn emit_row_terminator(&mut self) -> io::Result<()> {
        // raw mode does not translate \n into a carriage return
        queue!(self.out, Print("\r\n"))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn await_acknowledgment(&mut self) -> io::Result<()> {
        let key = wait_for_key_press(&mut self.events)?;
        debug!("Acknowledged with {:?}", key.code);
        Ok(())
    }

    fn teardown(&mut self) -> io::Result<()> {
        if self.alternate_screen {
            self.alternate_screen = false;
            execute!(self.out, ResetColor, Show, LeaveAlternateScreen)?;
        }
        if self.raw_mode {
            self.raw_mode = false;
            disable_raw_mode()?;
        }
        Ok(())
    }
}

impl<W: Write, E: EventSource> Drop for CrosstermTerminal<W, E> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("Failed to restore terminal: {e}");
        }
    }
}
