use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::builtin::BUILTIN_NAMES;

/// Prefix completion over PATH directory entries and the builtin names.
/// Every query rescans the directories.
pub struct Completer {
    search_path: Vec<PathBuf>,
}

impl Completer {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        return Self { search_path };
    }

    /// The only candidate for `prefix`, if there is exactly one.
    pub fn unique_match(&self, prefix: &str) -> Option<String> {
        let mut matches = self.matches(prefix).into_iter();
        let only = matches.next()?;
        if matches.next().is_some() {
            return None;
        }

        return Some(only);
    }

    /// All candidates for `prefix`: builtins first, then directory scan order.
    /// A name found in several directories is listed once.
    pub fn matches(&self, prefix: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        let builtins = BUILTIN_NAMES.iter().map(|name| name.to_string());
        for name in builtins.chain(self.scan()) {
            if name.starts_with(prefix) && seen.insert(name.clone()) {
                matches.push(name);
            }
        }

        debug!("{} completion candidates for {:?}", matches.len(), prefix);
        return matches;
    }

    fn scan(&self) -> impl Iterator<Item = String> + '_ {
        return self
            .search_path
            .iter()
            .filter_map(|dir| fs::read_dir(dir).ok())
            .flat_map(|entries| entries.flatten())
            .filter_map(|entry| entry.file_name().into_string().ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn bin_dir(names: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            File::create(dir.path().join(name)).unwrap();
        }
        dir
    }

    #[test]
    fn single_entry_is_a_unique_match() {
        let dir = bin_dir(&["zqfrobnicate", "zqother"]);
        let completer = Completer::new(vec![dir.path().to_path_buf()]);

        assert_eq!(
            completer.unique_match("zqfrob"),
            Some("zqfrobnicate".to_string())
        );
    }

    #[test]
    fn several_entries_have_no_unique_match() {
        let dir = bin_dir(&["zqfrobnicate", "zqfrobulate", "zqother"]);
        let completer = Completer::new(vec![dir.path().to_path_buf()]);

        assert_eq!(completer.unique_match("zqfrob"), None);

        let matches = completer.matches("zqfrob");
        assert_eq!(matches.len(), 2);
        assert!(matches.contains(&"zqfrobnicate".to_string()));
        assert!(matches.contains(&"zqfrobulate".to_string()));
    }

    #[test]
    fn no_entries_have_no_match() {
        let dir = bin_dir(&["zqother"]);
        let completer = Completer::new(vec![dir.path().to_path_buf()]);

        assert_eq!(completer.unique_match("zqx"), None);
        assert!(completer.matches("zqx").is_empty());
    }

    #[test]
    fn builtins_are_candidates() {
        let completer = Completer::new(Vec::new());

        assert_eq!(completer.unique_match("moti"), Some("motivate".to_string()));

        let matches = completer.matches("my");
        assert!(matches.contains(&"myjobs".to_string()));
        assert!(matches.contains(&"mybg".to_string()));
        assert!(matches.contains(&"myfg".to_string()));
    }

    #[test]
    fn same_name_in_two_directories_counts_once() {
        let first = bin_dir(&["zqtool"]);
        let second = bin_dir(&["zqtool"]);
        let completer = Completer::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);

        assert_eq!(completer.unique_match("zqt"), Some("zqtool".to_string()));
    }

    #[test]
    fn unreadable_directories_are_skipped() {
        let dir = bin_dir(&["zqtool"]);
        let completer = Completer::new(vec![
            PathBuf::from("/definitely/not/here"),
            dir.path().to_path_buf(),
        ]);

        assert_eq!(completer.unique_match("zqt"), Some("zqtool".to_string()));
    }
}
