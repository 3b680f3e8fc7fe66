// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;

use clap::ColorChoice;
use codespan_reporting::diagnostic::{
    Diagnostic as CodespanDiagnostic, Label as CodespanLabel, LabelStyle, Severity,
};
use codespan_reporting::files::{Error as FilesError, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, Color, ColorSpec, WriteColor};

/// Severity of diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

impl Level {
    fn severity(self) -> Severity {
        match self {
            Level::Error => Severity::Error,
            Level::Warning => Severity::Warning,
        }
    }
}

/// A labelled byte range of a configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    style: LabelStyle,
    message: String,
    range: (usize, usize),
}

impl Label {
    fn primary(message: &str, range: (usize, usize)) -> Self {
        Self {
            style: LabelStyle::Primary,
            message: message.to_string(),
            range,
        }
    }

    fn secondary(message: &str, range: (usize, usize)) -> Self {
        Self {
            style: LabelStyle::Secondary,
            message: message.to_string(),
            range,
        }
    }

    fn to_codespan_label(&self, fileid: usize) -> CodespanLabel<usize> {
        CodespanLabel::new(self.style, fileid, self.range.0..self.range.1)
            .with_message(self.message.clone())
    }
}

/// Diagnostic of a particular part of a configuration file, or a general
/// message when `location` is missing
struct Diagnostic {
    message: String,
    level: Level,
    location: Option<(usize, Vec<Label>)>,
}

impl Diagnostic {
    fn emit(
        &self,
        buffer: &mut Buffer,
        files: &SimpleFiles<String, String>,
    ) -> Result<(), FilesError> {
        if let Some((fileid, labels)) = &self.location {
            let diagnostic = CodespanDiagnostic::new(self.level.severity())
                .with_message(&self.message)
                .with_labels(labels.iter().map(|l| l.to_codespan_label(*fileid)).collect());
            term::emit(buffer, &term::Config::default(), files, &diagnostic)?;
        } else {
            let color = match self.level {
                Level::Error => Color::Red,
                Level::Warning => Color::Yellow,
            };
            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
            write!(buffer, "{:?}", self.level)?;
            buffer.set_color(&ColorSpec::new())?;
            writeln!(buffer, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Collects the source of every configuration file and renders diagnostics
/// against it. Everything emitted is echoed to stderr and kept in
/// `error_string` so callers and tests can inspect it.
pub struct DiagnosticHandler {
    files: SimpleFiles<String, String>,
    error_string: String,
    /// `color_choice` indicates whether to emit error messages w/ ANSI colors
    color_choice: ColorChoice,
}

impl Default for DiagnosticHandler {
    /// Default `DiagnosticHandler` does not emit colored error messages
    fn default() -> Self {
        Self::new(ColorChoice::Never)
    }
}

impl DiagnosticHandler {
    pub fn new(color_choice: ColorChoice) -> Self {
        Self {
            files: SimpleFiles::new(),
            error_string: String::new(),
            color_choice,
        }
    }

    /// Creates a buffer for error diagnostics
    /// (different buffers are created based on whether we want colors or not)
    fn create_buffer(&self) -> Buffer {
        if self.color_choice == ColorChoice::Never {
            Buffer::no_color()
        } else {
            Buffer::ansi()
        }
    }

    pub fn add_file(&mut self, name: String, content: String) -> usize {
        self.files.add(name, content)
    }

    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        let mut buffer = self.create_buffer();
        let msg = match diagnostic.emit(&mut buffer, &self.files) {
            Ok(()) => String::from_utf8_lossy(buffer.as_slice()).into_owned(),
            // the span did not fit the file; fall back to the bare message
            Err(_) => format!("{:?}: {}\n", diagnostic.level, diagnostic.message),
        };
        self.error_string.push_str(&msg);
        eprint!("{}", msg);
    }

    /// Reports `message` at the byte range `start..end` of file `fileid`
    pub fn emit_diagnostic_span(
        &mut self,
        message: &str,
        fileid: usize,
        (start, end): (usize, usize),
        level: Level,
    ) {
        self.report(Diagnostic {
            message: message.to_string(),
            level,
            location: Some((fileid, vec![Label::primary(message, (start, end))])),
        });
    }

    /// Reports a name that is defined at `second` after already being
    /// defined at `first`
    pub fn emit_diagnostic_duplicate(
        &mut self,
        message: &str,
        fileid: usize,
        first: (usize, usize),
        second: (usize, usize),
    ) {
        self.report(Diagnostic {
            message: message.to_string(),
            level: Level::Error,
            location: Some((
                fileid,
                vec![
                    Label::primary("defined again here", second),
                    Label::secondary("first defined here", first),
                ],
            )),
        });
    }

    pub fn emit_general_message(&mut self, message: &str, level: Level) {
        self.report(Diagnostic {
            message: message.to_string(),
            level,
            location: None,
        });
    }
}
