use crate::keymap::KeyMapping;
use colored::*;
use std::io::{self, Write};
use std::path::Path;

/// The query layer that consumes the index: attaches to it, refreshes it,
/// accepts key mappings and shows status messages.
pub trait QueryHost {
    fn add_connection(&mut self, index: &Path) -> io::Result<()>;
    fn reset_connections(&mut self) -> io::Result<()>;
    fn kill_connection(&mut self, index: &Path) -> io::Result<()>;
    fn map_key(&mut self, mapping: &KeyMapping) -> io::Result<()>;
    fn message(&mut self, text: &str) -> io::Result<()>;
}

/// Writes one vim ex command per line, suitable for `:source` or for an
/// editor reading the tool's stdout.
pub struct ExCommandHost<W: Write> {
    out: W,
}

impl<W: Write> ExCommandHost<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }
}

impl<W: Write> QueryHost for ExCommandHost<W> {
    fn add_connection(&mut self, index: &Path) -> io::Result<()> {
        let index = escape_filename(index)?;
        self.line(&format!("cscope add {}", index))
    }

    fn reset_connections(&mut self) -> io::Result<()> {
        self.line("cscope reset")
    }

    fn kill_connection(&mut self, index: &Path) -> io::Result<()> {
        let index = escape_filename(index)?;
        self.line(&format!("cscope kill {}", index))
    }

    fn map_key(&mut self, mapping: &KeyMapping) -> io::Result<()> {
        self.line(&mapping.to_ex_command())
    }

    fn message(&mut self, text: &str) -> io::Result<()> {
        let mut escaped = String::with_capacity(text.len() + 2);
        for c in text.chars() {
            match c {
                '\\' => escaped.push_str(r"\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str(r"\n"),
                '\r' => escaped.push_str(r"\r"),
                c => escaped.push(c),
            }
        }
        self.line(&format!("echo \"{}\"", escaped))
    }
}

/// Human-readable output for one-shot terminal use.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl QueryHost for ConsoleHost {
    fn add_connection(&mut self, index: &Path) -> io::Result<()> {
        println!("{} {}", "Attached index:".green().bold(), index.display());
        Ok(())
    }

    fn reset_connections(&mut self) -> io::Result<()> {
        println!("{}", "Reset index connection".green());
        Ok(())
    }

    fn kill_connection(&mut self, index: &Path) -> io::Result<()> {
        println!("{} {}", "Detached index:".yellow(), index.display());
        Ok(())
    }

    fn map_key(&mut self, mapping: &KeyMapping) -> io::Result<()> {
        println!("  {} {}", mapping.lhs.bright_cyan(), mapping.rhs);
        Ok(())
    }

    fn message(&mut self, text: &str) -> io::Result<()> {
        println!("{}", text.yellow());
        Ok(())
    }
}

/// Escapes a path for an ex command argument. Line breaks cannot be
/// expressed there, so such paths are refused.
fn escape_filename(path: &Path) -> io::Result<String> {
    let raw = path.to_string_lossy();
    if raw.contains(['\n', '\r']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path contains a line break: {:?}", raw),
        ));
    }
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, ' ' | '\\' | '|' | '"' | '%' | '#') {
            out.push('\\');
        }
        out.push(c);
    }
    Ok(out)
}
