//! Flat text persistence of the expansion set and selection.
//!
//! The format is one expanded path per line, in the order produced by
//! [`crate::FileSystemTreeView::expanded_paths`], followed by one trailing
//! line carrying the 0-based index of the selected path in that list, or a
//! negative value when there is no selection. Unknown lines are discarded
//! on read.

use crate::error::TreeViewError;
use crate::facade::FileSystemTreeView;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// A snapshot of the host-visible tree state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeViewState {
    expanded: Vec<PathBuf>,
    selected: Option<usize>,
}

impl TreeViewState {
    /// Captures the current expansion set and selection of a tree.
    pub fn capture(view: &FileSystemTreeView) -> Self {
        let expanded: Vec<PathBuf> = view.expanded_paths().into_iter().collect();
        let selected = view
            .selected_path()
            .and_then(|path| expanded.iter().position(|p| *p == path));
        Self { expanded, selected }
    }

    /// Re-applies the snapshot: expands every stored path, then restores
    /// the selection.
    pub fn apply(&self, view: &FileSystemTreeView) -> Result<(), TreeViewError> {
        view.set_expanded_paths(&self.expanded)?;
        match self.selected.and_then(|index| self.expanded.get(index)) {
            Some(path) => {
                view.expand_path(Some(path), false, true)?;
            }
            None => view.clear_selection(),
        }
        Ok(())
    }

    pub fn expanded(&self) -> &[PathBuf] {
        &self.expanded
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Writes the snapshot in the flat text form.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for path in &self.expanded {
            writeln!(writer, "{}", path.display())?;
        }
        let index: i64 = match self.selected {
            Some(index) => index as i64,
            None => -1,
        };
        writeln!(writer, "{index}")
    }

    /// Reads a snapshot from the flat text form.
    ///
    /// Empty lines and integer lines before the end are discarded; only
    /// the last line is interpreted as the selection index.
    pub fn read_from<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line.trim().to_string());
            }
        }
        let selected = match lines.last().and_then(|line| line.parse::<i64>().ok()) {
            Some(index) => {
                lines.pop();
                usize::try_from(index).ok()
            }
            None => None,
        };
        let expanded: Vec<PathBuf> = lines
            .into_iter()
            .filter(|line| line.parse::<i64>().is_err())
            .map(PathBuf::from)
            .collect();
        let selected = selected.filter(|index| *index < expanded.len());
        Ok(Self { expanded, selected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn state(paths: &[&str], selected: Option<usize>) -> TreeViewState {
        TreeViewState {
            expanded: paths.iter().map(PathBuf::from).collect(),
            selected,
        }
    }

    #[test]
    fn test_write_format() {
        let mut out = Vec::new();
        state(&["/a/b", "/a/c"], Some(1)).write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "/a/b\n/a/c\n1\n");
    }

    #[test]
    fn test_write_without_selection_uses_negative_index() {
        let mut out = Vec::new();
        state(&["/a"], None).write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "/a\n-1\n");
    }

    #[test]
    fn test_round_trip() {
        let original = state(&["/a/b", "/x/y/z"], Some(0));
        let mut out = Vec::new();
        original.write_to(&mut out).unwrap();
        let restored = TreeViewState::read_from(Cursor::new(out)).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_read_discards_unknown_lines() {
        let text = "\n/a/b\n42\n/c\n\n0\n";
        let restored = TreeViewState::read_from(Cursor::new(text)).unwrap();
        assert_eq!(restored, state(&["/a/b", "/c"], Some(0)));
    }

    #[test]
    fn test_read_negative_index_means_no_selection() {
        let restored = TreeViewState::read_from(Cursor::new("/a\n-1\n")).unwrap();
        assert_eq!(restored, state(&["/a"], None));
    }

    #[test]
    fn test_read_out_of_range_index_is_dropped() {
        let restored = TreeViewState::read_from(Cursor::new("/a\n7\n")).unwrap();
        assert_eq!(restored, state(&["/a"], None));
    }
}
