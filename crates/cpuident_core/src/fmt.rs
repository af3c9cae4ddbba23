//! Formatting helpers for the text report.

use core::fmt::{self, Formatter, Write};

enum Indentation<'a> {
    Spaced(usize),
    Str(&'a str),
}

/// Writer that prefixes every line written through it with an indentation.
/// 
/// Nested reports are written by wrapping the formatter of the outer report, so each level only needs to know about its own indentation.
pub struct Indenter<'a, 'b> {
    inner:        &'a mut Formatter<'b>,
    indentation:  Indentation<'a>,
    needs_indent: bool,
}

impl<'a, 'b> Indenter<'a, 'b> {
    /// Create an indenter with an indentation of 4 spaces.
    pub fn new(f: &'a mut Formatter<'b>) -> Self {
        Self::with_spaced(f, 4)
    }

    pub fn with_spaced(f: &'a mut Formatter<'b>, spaces: usize) -> Self {
        Self {
            inner: f,
            indentation: Indentation::Spaced(spaces),
            needs_indent: true,
        }
    }

    pub fn with_str(f: &'a mut Formatter<'b>, s: &'a str) -> Self {
        Self {
            inner: f,
            indentation: Indentation::Str(s),
            needs_indent: true,
        }
    }

    /// Change the indentation of all lines started after this call.
    pub fn set_spaces(&mut self, spaces: usize) {
        self.indentation = Indentation::Spaced(spaces);
    }

    pub fn set_str(&mut self, s: &'a str) {
        self.indentation = Indentation::Str(s);
    }

    fn write_indent(&mut self) -> fmt::Result {
        match self.indentation {
            Indentation::Spaced(size) => write!(self.inner, "{: >size$}", ""),
            Indentation::Str(s) => self.inner.write_str(s),
        }
    }
}

impl Write for Indenter<'_, '_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for (idx, line) in s.split('\n').enumerate() {
            if idx > 0 {
                self.inner.write_char('\n')?;
                self.needs_indent = true;
            }
            if line.is_empty() {
                continue;
            }

            // Values formatted into the middle of a line don't get indented
            if self.needs_indent {
                self.write_indent()?;
                self.needs_indent = false;
            }
            self.inner.write_str(line)?;
        }
        Ok(())
    }
}

/// Checkbox used by the report to show whether a flag is set.
pub(crate) fn checkbox(set: bool) -> &'static str {
    if set { "[X]" } else { "[ ]" }
}

#[cfg(test)]
mod test {
    use core::fmt::{self, Write};

    use super::Indenter;

    struct Nested;

    impl fmt::Display for Nested {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "outer:")?;
            let mut indenter = Indenter::new(f);
            writeln!(indenter, "a: {}", 1)?;
            indenter.set_spaces(8);
            writeln!(indenter, "b\nc")?;
            indenter.set_str("> ");
            write!(indenter, "d")
        }
    }

    #[test]
    fn indents_each_line() {
        assert_eq!(Nested.to_string(), "outer:\n    a: 1\n        b\n        c\n> d");
    }

    #[test]
    fn empty_lines_are_not_indented() {
        struct Blank;
        impl fmt::Display for Blank {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut indenter = Indenter::with_spaced(f, 2);
                write!(indenter, "x\n\ny")
            }
        }
        assert_eq!(Blank.to_string(), "  x\n\n  y");
    }
}
