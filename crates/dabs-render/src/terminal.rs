//! Printing styled lines according to where stdout goes

use std::io::{self, IsTerminal, Write};

use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::debug;
use unicode_width::UnicodeWidthChar;

use crate::error::RenderError;

const ATTRIBUTES: [(Modifier, Attribute); 5] = [
    (Modifier::BOLD, Attribute::Bold),
    (Modifier::DIM, Attribute::Dim),
    (Modifier::ITALIC, Attribute::Italic),
    (Modifier::UNDERLINED, Attribute::Underlined),
    (Modifier::REVERSED, Attribute::Reverse),
];

/// Kind of standard output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Interactive terminal
    Terminal,
    /// Pipe into another program
    Pipe,
    /// Redirected into a file
    File,
}

impl OutputMode {
    /// Inspect the current standard output
    #[must_use]
    pub fn detect() -> Self {
        if io::stdout().is_terminal() {
            OutputMode::Terminal
        } else if stdout_is_fifo() {
            OutputMode::Pipe
        } else {
            OutputMode::File
        }
    }

    fn styled(self) -> bool {
        self != OutputMode::File
    }
}

#[cfg(unix)]
fn stdout_is_fifo() -> bool {
    use std::os::unix::fs::FileTypeExt;

    std::fs::metadata("/dev/stdout").is_ok_and(|m| m.file_type().is_fifo())
}

#[cfg(not(unix))]
fn stdout_is_fifo() -> bool {
    false
}

fn to_terminal_color(color: Color) -> TermColor {
    match color {
        Color::Reset => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
    }
}

/// Cut a line to at most `width` terminal columns
#[must_use]
pub fn truncate(line: &Line<'_>, width: usize) -> Line<'static> {
    let mut used = 0;
    let mut spans = Vec::new();
    for span in &line.spans {
        let mut content = String::new();
        for c in span.content.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width {
                break;
            }
            used += w;
            content.push(c);
        }
        let full = content.len() == span.content.len();
        if !content.is_empty() {
            spans.push(Span::styled(content, span.style));
        }
        if !full {
            break;
        }
    }
    Line::from(spans).style(line.style)
}

fn write_ansi<W: Write>(out: &mut W, line: &Line<'_>) -> io::Result<()> {
    for span in &line.spans {
        let style = line.style.patch(span.style);
        if style == Style::default() {
            queue!(out, Print(&span.content))?;
            continue;
        }
        if let Some(fg) = style.fg {
            queue!(out, SetForegroundColor(to_terminal_color(fg)))?;
        }
        if let Some(bg) = style.bg {
            queue!(out, SetBackgroundColor(to_terminal_color(bg)))?;
        }
        for (modifier, attribute) in ATTRIBUTES {
            if style.add_modifier.contains(modifier) {
                queue!(out, SetAttribute(attribute))?;
            }
        }
        queue!(out, Print(&span.content), SetAttribute(Attribute::Reset), ResetColor)?;
    }
    writeln!(out)
}

fn write_plain<W: Write>(out: &mut W, line: &Line<'_>) -> io::Result<()> {
    for span in &line.spans {
        out.write_all(span.content.as_bytes())?;
    }
    writeln!(out)
}

fn from_io(error: io::Error) -> RenderError {
    if error.kind() == io::ErrorKind::BrokenPipe {
        RenderError::BrokenPipe
    } else {
        RenderError::Io(error)
    }
}

/// Write `lines` for the given output mode, cut to `width` and `height`
///
/// # Errors
/// Returns [`RenderError::BrokenPipe`] when the reader went away and
/// [`RenderError::Io`] for other write failures.
pub fn write_lines<W: Write>(
    out: &mut W,
    lines: &[Line<'_>],
    mode: OutputMode,
    width: Option<usize>,
    height: Option<usize>,
) -> Result<(), RenderError> {
    let count = height.unwrap_or(lines.len()).min(lines.len());
    for line in &lines[..count] {
        let line = truncate(line, width.unwrap_or(usize::MAX));
        if mode.styled() {
            write_ansi(out, &line).map_err(from_io)?;
        } else {
            write_plain(out, &line).map_err(from_io)?;
        }
    }
    out.flush().map_err(from_io)
}

/// Print `lines` to stdout
///
/// On a terminal the output is styled and optionally cut to the terminal's
/// width and to its height less two rows. Pipes get full styled lines, files
/// plain text.
///
/// # Errors
/// Returns [`RenderError::BrokenPipe`] when the reader of a pipe went away.
pub fn modal_print(
    lines: &[Line<'_>],
    fit_width: bool,
    fit_height: bool,
) -> Result<(), RenderError> {
    let mode = OutputMode::detect();
    debug!("stdout mode: {mode:?}");

    let (width, height) = if mode == OutputMode::Terminal {
        let (columns, rows) = crossterm::terminal::size()?;
        (
            fit_width.then_some(usize::from(columns)),
            fit_height.then_some(usize::from(rows).saturating_sub(2)),
        )
    } else {
        (None, None)
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_lines(&mut out, lines, mode, width, height)
}

/// Print unstyled text to stdout as is
///
/// # Errors
/// Returns [`RenderError::BrokenPipe`] when the reader of a pipe went away.
pub fn print_text(text: &str) -> Result<(), RenderError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes()).map_err(from_io)?;
    out.flush().map_err(from_io)
}
