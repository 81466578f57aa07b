//! Indentation-aware source text builder

use std::fmt::{self, Write as _};

/// Accumulates generated source one line at a time, indenting with tabs.
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    buf: String,
    indent: usize,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Writes one formatted line at the current indentation. Empty lines carry
    /// no indentation.
    pub fn line_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        let mut text = String::new();
        text.write_fmt(args)?;
        self.push_line(&text);
        Ok(())
    }

    pub fn line(&mut self, text: &str) {
        self.push_line(text);
    }

    /// Appends multi-line text, re-indenting each line to the current level.
    pub fn append(&mut self, text: &str) {
        for line in text.trim_end_matches('\n').split('\n') {
            self.push_line(line);
        }
    }

    fn push_line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.buf.push('\t');
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation() {
        let mut cb = CodeBuilder::new();
        cb.line("func f() {");
        cb.indent();
        cb.append("a := 1\n\nreturn a\n");
        cb.dedent();
        cb.line("}");
        assert_eq!(cb.finish(), "func f() {\n\ta := 1\n\n\treturn a\n}\n");
    }

    #[test]
    fn test_formatted_line() {
        let mut cb = CodeBuilder::new();
        cb.line_fmt(format_args!("package {}", "fmt_bindings")).unwrap();
        assert_eq!(cb.as_str(), "package fmt_bindings\n");
    }
}
