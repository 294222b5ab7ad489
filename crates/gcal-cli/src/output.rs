//! Writing command results to the terminal.

use std::io::Write;
use std::sync::Mutex;

use gcal_core::{OutputFormatter, Tabular, select_fields};

use crate::container::Services;
use crate::error::CliResult;

/// Destination for command output.
///
/// `print` always writes; `info` is suppressed by `--quiet`.
pub struct Console {
    quiet: bool,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Console {
    pub fn stdout(quiet: bool) -> Self {
        Self::new(quiet, Box::new(std::io::stdout()))
    }

    pub fn new(quiet: bool, sink: Box<dyn Write + Send>) -> Self {
        Self {
            quiet,
            sink: Mutex::new(sink),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Writes `text` followed by a newline.
    pub fn print(&self, text: &str) -> CliResult<()> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| std::io::Error::other("output lock poisoned"))?;
        writeln!(sink, "{}", text)?;
        sink.flush()?;
        Ok(())
    }

    /// Writes an informational message unless quiet.
    pub fn info(&self, text: &str) -> CliResult<()> {
        if self.quiet {
            return Ok(());
        }
        self.print(text)
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

/// Prints a list of items in the selected format.
///
/// Quiet mode prints one id per line. An empty table prints the
/// translated `empty_key` message instead.
pub fn print_list<T: Tabular>(services: &Services, items: &[T], empty_key: &str) -> CliResult<()> {
    let console = services.console();
    if console.is_quiet() {
        for item in items {
            console.print(item.id())?;
        }
        return Ok(());
    }

    let fields = select_fields::<T>(services.options().fields.as_deref())?;
    let formatter = services.formatter();
    if items.is_empty() && !formatter.format().is_json() {
        return console.info(&services.i18n().t(empty_key));
    }
    console.print(&formatter.render_list(items, &fields)?)
}

/// Prints one item; without `--fields` every field is shown.
pub fn print_item<T: Tabular>(services: &Services, item: &T) -> CliResult<()> {
    let console = services.console();
    if console.is_quiet() {
        return console.print(item.id());
    }

    let fields = match services.options().fields.as_deref() {
        Some(requested) => select_fields::<T>(Some(requested))?,
        None => T::FIELDS.to_vec(),
    };
    let formatter: OutputFormatter<'_> = services.formatter();
    console.print(&formatter.render_item(item, &fields)?)
}

/// In-memory sink for inspecting output in tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_console_drops_info() {
        let buffer = SharedBuffer::default();
        let console = Console::new(true, Box::new(buffer.clone()));
        console.info("hello").unwrap();
        console.print("evt1").unwrap();
        assert_eq!(buffer.contents(), "evt1\n");
    }
}
