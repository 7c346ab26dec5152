//! Value transfer between the user and the store
//!
//! Values come in through a [`ValueSource`] and go out through a
//! [`ValueSink`]. The console reads lines from stdin after a prompt; the
//! X selection side shells out to `xclip`, falling back to `xsel`.

use drop_core::{Error, Result};
use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};
use tracing::debug;

/// Prompt shown while reading a value from the console
pub const VALUE_PROMPT: &str = "   : ";

/// Reads one line of input after showing a prompt
pub trait LineSource {
    /// Returns the line without its terminator, or `None` at end of input
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Where a new value comes from
pub trait ValueSource {
    /// `None` means no value was supplied and the operation is abandoned
    fn read(&mut self) -> Result<Option<String>>;
}

/// Where a fetched value goes
pub trait ValueSink {
    /// Hands over one stored value, byte for byte
    fn write(&mut self, value: &[u8]) -> Result<()>;
}

/// Line-oriented console: prompts on `prompt_out`, reads from `input`
pub struct Console<R, W> {
    input: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Creates a console over the given streams
    pub fn new(input: R, prompt_out: W) -> Self {
        Self { input, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for Console<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Console value source: prompts until a non-empty line arrives
pub struct PromptedValue<'a> {
    lines: &'a mut dyn LineSource,
}

impl<'a> PromptedValue<'a> {
    /// Reads values through `lines`
    pub fn new(lines: &'a mut dyn LineSource) -> Self {
        Self { lines }
    }
}

impl ValueSource for PromptedValue<'_> {
    fn read(&mut self) -> Result<Option<String>> {
        loop {
            match self.lines.read_line(VALUE_PROMPT)? {
                None => return Ok(None),
                Some(line) if line.is_empty() => continue,
                Some(line) => return Ok(Some(line)),
            }
        }
    }
}

/// Writes each value followed by a newline
pub struct LineSink<W> {
    out: W,
}

impl<W: Write> LineSink<W> {
    /// Sink over any writer
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ValueSink for LineSink<W> {
    fn write(&mut self, value: &[u8]) -> Result<()> {
        self.out.write_all(value)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// X selection buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// PRIMARY (middle-click paste)
    Primary,
    /// CLIPBOARD (explicit copy/paste)
    Clipboard,
}

impl Selection {
    fn xclip_name(self) -> &'static str {
        match self {
            Selection::Primary => "primary",
            Selection::Clipboard => "clipboard",
        }
    }

    fn xsel_flag(self) -> &'static str {
        match self {
            Selection::Primary => "--primary",
            Selection::Clipboard => "--clipboard",
        }
    }
}

/// Access to the X selection buffers
pub trait SelectionBuffer {
    /// Current contents of a selection, `None` if empty
    fn read(&mut self, selection: Selection) -> Result<Option<String>>;

    /// Replaces the contents of a selection
    fn write(&mut self, selection: Selection, value: &str) -> Result<()>;
}

/// Selection access through the `xclip` or `xsel` helper programs
#[derive(Debug, Default)]
pub struct XSelection;

impl XSelection {
    fn read_with(program: &str, args: &[&str]) -> io::Result<Vec<u8>> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!("{} exited with {}", program, output.status)));
        }
        Ok(output.stdout)
    }

    fn write_with(program: &str, args: &[&str], value: &str) -> io::Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(value.as_bytes())?;
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(io::Error::other(format!("{} exited with {}", program, status)));
        }
        Ok(())
    }
}

impl SelectionBuffer for XSelection {
    fn read(&mut self, selection: Selection) -> Result<Option<String>> {
        let bytes = Self::read_with("xclip", &["-o", "-selection", selection.xclip_name()])
            .or_else(|e| {
                debug!(error = %e, "xclip unavailable, trying xsel");
                Self::read_with("xsel", &["-o", selection.xsel_flag()])
            })
            .map_err(|e| Error::InvalidOperation(format!("could not read X selection: {}", e)))?;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    fn write(&mut self, selection: Selection, value: &str) -> Result<()> {
        Self::write_with("xclip", &["-i", "-selection", selection.xclip_name()], value)
            .or_else(|e| {
                debug!(error = %e, "xclip unavailable, trying xsel");
                Self::write_with("xsel", &["-i", selection.xsel_flag()], value)
            })
            .map_err(|e| Error::InvalidOperation(format!("could not set X selection: {}", e)))
    }
}

/// One selection viewed as a [`ValueSource`]/[`ValueSink`]
pub struct SelectionTransfer<'a> {
    buffer: &'a mut dyn SelectionBuffer,
    selection: Selection,
}

impl<'a> SelectionTransfer<'a> {
    /// Binds a buffer to one selection
    pub fn new(buffer: &'a mut dyn SelectionBuffer, selection: Selection) -> Self {
        Self { buffer, selection }
    }
}

impl ValueSource for SelectionTransfer<'_> {
    fn read(&mut self) -> Result<Option<String>> {
        self.buffer.read(self.selection)
    }
}

impl ValueSink for SelectionTransfer<'_> {
    fn write(&mut self, value: &[u8]) -> Result<()> {
        self.buffer.write(self.selection, &String::from_utf8_lossy(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_console_reads_lines_and_shows_prompt() {
        let mut prompts = Vec::new();
        {
            let mut console = Console::new(Cursor::new("first\r\nsecond\n"), &mut prompts);
            assert_eq!(console.read_line("? ").unwrap(), Some("first".to_string()));
            assert_eq!(console.read_line("? ").unwrap(), Some("second".to_string()));
            assert_eq!(console.read_line("? ").unwrap(), None);
        }
        assert_eq!(prompts, b"? ? ? ");
    }

    #[test]
    fn test_prompted_value_skips_empty_lines() {
        let mut prompts = Vec::new();
        let mut console = Console::new(Cursor::new("\n\nsecret value\n"), &mut prompts);
        let value = PromptedValue::new(&mut console).read().unwrap();
        assert_eq!(value, Some("secret value".to_string()));
        drop(console);
        assert_eq!(prompts, VALUE_PROMPT.repeat(3).as_bytes());
    }

    #[test]
    fn test_prompted_value_eof_aborts() {
        let mut console = Console::new(Cursor::new("\n"), io::sink());
        assert_eq!(PromptedValue::new(&mut console).read().unwrap(), None);
    }

    #[test]
    fn test_line_sink() {
        let mut out = Vec::new();
        LineSink::new(&mut out).write(b"hello world").unwrap();
        assert_eq!(out, b"hello world\n");

        let mut out = Vec::new();
        LineSink::new(&mut out).write(&[0xff, b'a', 0x00]).unwrap();
        assert_eq!(out, [0xff, b'a', 0x00, b'\n']);
    }

    struct Fake(Option<String>);

    impl SelectionBuffer for Fake {
        fn read(&mut self, _: Selection) -> Result<Option<String>> {
            Ok(self.0.clone())
        }

        fn write(&mut self, selection: Selection, value: &str) -> Result<()> {
            self.0 = Some(format!("{:?}:{}", selection, value));
            Ok(())
        }
    }

    #[test]
    fn test_selection_transfer_binds_selection() {
        let mut fake = Fake(None);
        SelectionTransfer::new(&mut fake, Selection::Clipboard)
            .write(b"v")
            .unwrap();
        assert_eq!(fake.0.as_deref(), Some("Clipboard:v"));

        let got = SelectionTransfer::new(&mut fake, Selection::Primary).read().unwrap();
        assert_eq!(got.as_deref(), Some("Clipboard:v"));
    }
}
