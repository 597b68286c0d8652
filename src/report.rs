//! Operator-facing output lines.
//!
//! Write failures are ignored: losing a status line must never abort an
//! operation that has already changed remote state.

use std::io::Write;

/// Writes prefixed status lines and progress markers.
#[derive(Debug)]
pub struct Reporter<W: Write> {
    out: W,
    mid_line: bool,
}

impl<W: Write> Reporter<W> {
    /// Wraps a writer.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            mid_line: false,
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, prefix: &str, message: &str) {
        self.finish_progress();
        writeln!(self.out, "{prefix}{message}").ok();
    }

    /// Informational line.
    pub fn info(&mut self, message: &str) {
        self.line("- ", message);
    }

    /// Success line.
    pub fn success(&mut self, message: &str) {
        self.line("+ ", message);
    }

    /// Error line for recoverable failures.
    pub fn error(&mut self, message: &str) {
        self.line("! ", message);
    }

    /// Unprefixed line, used for tables and bare values.
    pub fn plain(&mut self, message: &str) {
        self.line("", message);
    }

    /// Starts a line that progress markers will extend.
    pub fn begin_progress(&mut self, message: &str) {
        self.finish_progress();
        write!(self.out, "- {message}").ok();
        self.out.flush().ok();
        self.mid_line = true;
    }

    /// Emits one progress marker.
    pub fn tick(&mut self) {
        write!(self.out, ".").ok();
        self.out.flush().ok();
        self.mid_line = true;
    }

    /// Terminates a pending progress line.
    pub fn finish_progress(&mut self) {
        if self.mid_line {
            writeln!(self.out).ok();
            self.mid_line = false;
        }
    }

    /// Empty separator line.
    pub fn blank(&mut self) {
        self.finish_progress();
        writeln!(self.out).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap_or_else(|err| panic!("utf8: {err}"))
    }

    #[test]
    fn prefixes_line_kinds() {
        let mut reporter = Reporter::new(Vec::new());
        reporter.info("Connecting...");
        reporter.success("Connected!");
        reporter.error("Not connected.");
        reporter.plain("203.0.113.9");
        assert_eq!(
            rendered(reporter),
            "- Connecting...\n+ Connected!\n! Not connected.\n203.0.113.9\n"
        );
    }

    #[test]
    fn progress_markers_share_a_line() {
        let mut reporter = Reporter::new(Vec::new());
        reporter.begin_progress("Waiting");
        reporter.tick();
        reporter.tick();
        reporter.success("Done");
        assert_eq!(rendered(reporter), "- Waiting..\n+ Done\n");
    }
}
