//! Entered vocabulary lines, masking and plain-text export.

use crate::error::{DictationError, DictationResult};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name used for exported lists
pub const EXPORT_FILE_NAME: &str = "dictation-list.txt";

/// Line separator in exported lists
pub const EXPORT_LINE_SEPARATOR: &str = "\r\n";

/// One input line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    /// Raw text as typed
    pub text: String,
    /// Text is concealed and read-only during dictation
    pub masked: bool,
    /// Line is left out during dictation because it was empty
    pub hidden: bool,
}

impl Line {
    fn with_text(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }

    /// Text without surrounding whitespace
    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Whether the line holds anything besides whitespace
    #[must_use]
    pub fn is_entered(&self) -> bool {
        !self.trimmed().is_empty()
    }
}

/// Ordered input lines, never fewer than a minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyList {
    lines: Vec<Line>,
    min_lines: usize,
}

impl VocabularyList {
    /// Create a list of empty lines
    #[must_use]
    pub fn new(min_lines: usize) -> Self {
        Self {
            lines: vec![Line::default(); min_lines],
            min_lines,
        }
    }

    /// Restore a saved list, padding it with empty lines up to the minimum
    #[must_use]
    pub fn from_saved(saved: Vec<String>, min_lines: usize) -> Self {
        let mut lines: Vec<Line> = saved.into_iter().map(Line::with_text).collect();
        if lines.len() < min_lines {
            lines.resize(min_lines, Line::default());
        }
        Self { lines, min_lines }
    }

    /// All lines in display order
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Number of lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the list has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Raw text of every line, blanks included, for persistence
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.text.clone()).collect()
    }

    /// Trimmed text of every entered line that is not hidden, in order
    #[must_use]
    pub fn entered_items(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|line| !line.hidden && line.is_entered())
            .map(|line| line.trimmed().to_string())
            .collect()
    }

    /// Trimmed text of one line, `None` if blank
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range
    pub fn item(&self, index: usize) -> DictationResult<Option<&str>> {
        let line = self.line(index)?;
        Ok(line.is_entered().then(|| line.trimmed()))
    }

    /// Replace the text of one line
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range, or the line is masked
    /// or hidden
    pub fn set_item(&mut self, index: usize, text: impl Into<String>) -> DictationResult<()> {
        let line = self.line_mut(index)?;
        if line.hidden {
            return Err(DictationError::invalid_input(format!(
                "Line {} is hidden during dictation",
                index + 1
            )));
        }
        if line.masked {
            return Err(DictationError::invalid_input(format!(
                "Line {} is read-only during dictation",
                index + 1
            )));
        }
        line.text = text.into();
        Ok(())
    }

    /// Append an empty line and return its index
    pub fn add_line(&mut self) -> usize {
        self.lines.push(Line::default());
        self.lines.len() - 1
    }

    /// Shuffle the visible lines in place
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Shuffle the visible lines with the given random source
    ///
    /// Hidden lines keep their positions.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let positions: Vec<usize> = (0..self.lines.len())
            .filter(|&i| !self.lines[i].hidden)
            .collect();

        let mut visible: Vec<Line> = positions.iter().map(|&i| self.lines[i].clone()).collect();
        visible.shuffle(rng);

        for (position, line) in positions.into_iter().zip(visible) {
            self.lines[position] = line;
        }
        debug!("Shuffled {} visible lines", self.lines.iter().filter(|l| !l.hidden).count());
    }

    /// Mask entered lines and hide blank ones
    ///
    /// # Errors
    ///
    /// Returns `NothingEntered` and leaves every line visible if no line
    /// has text
    pub fn mask_entered(&mut self) -> DictationResult<usize> {
        let entered = self.lines.iter().filter(|line| line.is_entered()).count();
        if entered == 0 {
            for line in &mut self.lines {
                line.hidden = false;
            }
            return Err(DictationError::NothingEntered);
        }

        for line in &mut self.lines {
            let is_entered = line.is_entered();
            line.masked = is_entered;
            line.hidden = !is_entered;
        }
        Ok(entered)
    }

    /// Reveal every masked line and make it editable again
    pub fn reveal(&mut self) {
        for line in &mut self.lines {
            line.masked = false;
        }
    }

    /// Replace everything with empty lines
    pub fn reset(&mut self) {
        self.lines = vec![Line::default(); self.min_lines];
    }

    /// Entered items, one per line
    ///
    /// # Errors
    ///
    /// Returns `NothingToExport` if no line has text
    pub fn export_text(&self) -> DictationResult<String> {
        let items = self.entered_items();
        if items.is_empty() {
            return Err(DictationError::NothingToExport);
        }
        Ok(items.join(EXPORT_LINE_SEPARATOR))
    }

    /// Write the export into `dir` and return the file path
    ///
    /// # Errors
    ///
    /// Returns an error if there is nothing to export or the file cannot be written
    pub fn export_to_file(&self, dir: &Path) -> DictationResult<PathBuf> {
        let content = self.export_text()?;
        let path = dir.join(EXPORT_FILE_NAME);
        std::fs::write(&path, content)?;
        info!("Exported list to {}", path.display());
        Ok(path)
    }

    fn line(&self, index: usize) -> DictationResult<&Line> {
        self.lines.get(index).ok_or_else(|| {
            DictationError::invalid_input(format!(
                "Line {index} out of range (list has {} lines)",
                self.lines.len()
            ))
        })
    }

    fn line_mut(&mut self, index: usize) -> DictationResult<&mut Line> {
        let len = self.lines.len();
        self.lines.get_mut(index).ok_or_else(|| {
            DictationError::invalid_input(format!(
                "Line {index} out of range (list has {len} lines)"
            ))
        })
    }
}

impl Default for VocabularyList {
    fn default() -> Self {
        Self::new(crate::MIN_LINES)
    }
}
