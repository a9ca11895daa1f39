use std::{fmt, ops::Range};

/// An error together with the byte range of the code it applies to.
#[derive(Debug)]
pub struct Diagnostic {
    pub error: anyhow::Error,
    pub range: Range<usize>,
}

pub trait IntoDiagnosticRange {
    fn into_range(self) -> Range<usize>;
}

impl IntoDiagnosticRange for usize {
    fn into_range(self) -> Range<usize> {
        self..self
    }
}

impl IntoDiagnosticRange for Range<usize> {
    fn into_range(self) -> Range<usize> {
        self
    }
}

impl Diagnostic {
    pub fn error(error: impl Into<anyhow::Error>, range: impl IntoDiagnosticRange) -> Self {
        Self {
            error: error.into(),
            range: range.into_range(),
        }
    }

    /// Returns the underlying error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref()
    }

    /// Renders the line containing the diagnostic, underlined with carets.
    pub fn render(&self, code: &str) -> String {
        let start = self.range.start.min(code.len());
        let end = self.range.end.clamp(start, code.len());

        let line_start = code[..start].rfind('\n').map_or(0, |index| index + 1);
        let line_end = code[end..].find('\n').map_or(code.len(), |index| end + index);

        let pad = code[line_start..start].chars().count();
        let marker = if start == end {
            "\\".to_owned()
        } else {
            "^".repeat(code[start..end].chars().count())
        };

        format!(
            "{}\n{}{} {}",
            &code[line_start..line_end],
            " ".repeat(pad),
            marker,
            self.error
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {}..{})", self.error, self.range.start, self.range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_underlines_range() {
        let code = "a = 1\nb = nope + 1\n";
        let diagnostic = Diagnostic::error(anyhow::anyhow!("undefined: nope"), 10..14);

        assert_eq!(
            diagnostic.render(code),
            "b = nope + 1\n    ^^^^ undefined: nope"
        );
    }

    #[test]
    fn render_empty_range() {
        let code = "x = (";
        let diagnostic = Diagnostic::error(anyhow::anyhow!("expected expression"), 5);

        assert_eq!(diagnostic.render(code), "x = (\n     \\ expected expression");
    }
}
