//! Sinks for rows that could not be loaded.

use anyhow::{Context, Result};
use log::warn;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::PersonId;

/// Receives one call per skipped row. `id` is `None` when the row was too short
/// to read an id from.
pub trait Reporter {
    fn report(&mut self, line: usize, id: Option<&PersonId>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<PersonId>,
}

impl RowError {
    pub fn new(line: usize, id: Option<PersonId>) -> Self {
        RowError { line, id }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "Error processing line #{} for ID #{}", self.line, id),
            None => write!(f, "Error processing line #{} for ID #<unknown>", self.line),
        }
    }
}

/// Writes each skipped row as a line of text, e.g. into `error.log`.
pub struct WriterReporter<W: Write> {
    target: W,
}

impl WriterReporter<File> {
    /// Creates the log file, truncating whatever a previous run left there.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("creating error log {}", path.display()))?;
        Ok(WriterReporter::new(file))
    }
}

impl<W: Write> WriterReporter<W> {
    pub fn new(target: W) -> Self {
        WriterReporter { target }
    }

    pub fn into_inner(self) -> W {
        self.target
    }
}

impl<W: Write> Reporter for WriterReporter<W> {
    fn report(&mut self, line: usize, id: Option<&PersonId>) {
        let entry = RowError::new(line, id.cloned());
        warn!("{}", entry);
        // a broken log must not stop the load
        if let Err(err) = writeln!(self.target, "{}", entry).and_then(|_| self.target.flush()) {
            warn!("could not write to error log: {}", err);
        }
    }
}

/// Keeps skipped rows in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    errors: Vec<RowError>,
}

impl MemoryReporter {
    pub fn errors(&self) -> &[RowError] {
        &self.errors
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, line: usize, id: Option<&PersonId>) {
        self.errors.push(RowError::new(line, id.cloned()));
    }
}

#[test]
fn line_format() {
    let mut reporter = WriterReporter::new(Vec::new());
    reporter.report(3, Some(&PersonId::Number(2)));
    reporter.report(5, None);
    reporter.report(9, Some(&PersonId::Text("A7".to_string())));

    assert_eq!(
        String::from_utf8(reporter.into_inner()).unwrap(),
        "Error processing line #3 for ID #2\n\
         Error processing line #5 for ID #<unknown>\n\
         Error processing line #9 for ID #A7\n"
    );
}

#[test]
fn create_truncates_previous_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("error.log");
    std::fs::write(&path, "left over from last run\n").unwrap();

    let mut reporter = WriterReporter::create(&path).unwrap();
    reporter.report(2, None);
    drop(reporter);

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Error processing line #2 for ID #<unknown>\n"
    );
}

#[test]
fn create_fails_for_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("error.log");

    assert!(WriterReporter::create(&path).is_err());
}
