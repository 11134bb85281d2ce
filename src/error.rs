//! Error types for loading templates files

use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ariadne::{Config, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::template::TemplateError;

/// Why a single candidate templates file could not be used
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read templates file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed JSON or a shape that does not match the templates schema
    #[error("invalid templates file {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to resolve templates in {}: {source}", .path.display())]
    Resolution {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
}

impl SourceError {
    /// The file the error refers to
    pub fn path(&self) -> &Path {
        match self {
            SourceError::Io { path, .. }
            | SourceError::Invalid { path, .. }
            | SourceError::Resolution { path, .. } => path,
        }
    }

    /// True when the file simply does not exist
    pub fn is_missing(&self) -> bool {
        matches!(self, SourceError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Format the error with source context using ariadne
    ///
    /// `source` is the text of the file the error came from. I/O errors have
    /// no location and are returned as their plain message.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let (span, detail) = match self {
            SourceError::Io { .. } => return self.to_string(),
            SourceError::Invalid { source: err, .. } => (
                clamp_span(source, line_column_offset(source, err.line(), err.column())),
                err.to_string(),
            ),
            SourceError::Resolution { source: err, .. } => {
                (quoted_name_span(source, err.template_name()), err.to_string())
            }
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_config(Config::default().with_color(false))
            .with_message(self.to_string())
            .with_label(Label::new((filename, span)).with_message(detail))
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Character offset of a 1-based line/column position
fn line_column_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (idx, text) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            return offset + text.chars().take(column.saturating_sub(1)).count();
        }
        offset += text.chars().count();
    }
    offset
}

fn clamp_span(source: &str, start: usize) -> Range<usize> {
    let len = source.chars().count();
    let start = start.min(len.saturating_sub(1));
    start..(start + 1).min(len)
}

/// Span of the first `"name"` string in the source, or the start of file
fn quoted_name_span(source: &str, name: &str) -> Range<usize> {
    let needle = format!("\"{}\"", name);
    let mut matches = source.match_indices(&needle).map(|(byte, _)| byte);
    let first = matches.next();
    // Prefer the object key over an `extends` value naming the same template
    let key = first.into_iter().chain(matches).find(|&byte| {
        source[byte + needle.len()..].trim_start().starts_with(':')
    });

    match key.or(first) {
        Some(byte) => {
            let start = source[..byte].chars().count();
            start..start + needle.chars().count()
        }
        None => clamp_span(source, 0),
    }
}
