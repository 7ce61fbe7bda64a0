//! Inclusion policies deciding which detected changes are recorded and which directories
//! the synchronizer descends into.
use std::path::{Path, PathBuf};

use crate::change::{ItemType, OfflineChangeType};

/// Pluggable inclusion policy consulted by the synchronizer.
///
/// Both predicates must be free of side effects, they are called many times per run.
pub trait OfflineSynchronizerFilter {
    /// Should the change of the given type be recorded for the path?
    fn should_pend(
        &self,
        _path: &Path,
        _change_type: OfflineChangeType,
        _server_item_type: Option<ItemType>,
    ) -> bool {
        true
    }

    /// Should the synchronizer descend into the given directory?
    fn should_recurse(&self, _directory: &Path) -> bool {
        true
    }
}

/// Accepts every change and every directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl OfflineSynchronizerFilter for AcceptAllFilter {}

#[derive(Debug, Clone)]
struct PatternRule {
    pattern: glob::Pattern,
    include: bool,
}

/// Glob based include/ignore rules, evaluated against paths relative to a base directory.
///
/// Relative paths are written with forward slashes and a leading '/', the base directory
/// itself is '/'. Paths outside of the base are never accepted.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    base: PathBuf,
    rules: Vec<PatternRule>,
}

impl PatternFilter {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base: base.into(),
            rules: vec![],
        }
    }

    pub fn add_ignore_rule(&mut self, rule: glob::Pattern) {
        self.add_rule(rule, false)
    }

    pub fn add_inclusion_rule(&mut self, rule: glob::Pattern) {
        self.add_rule(rule, true)
    }

    pub fn remove_rule(&mut self, pattern: &str) {
        self.rules.retain(|rule| rule.pattern.as_str() != pattern);
    }

    pub fn is_included(&self, path: &Path) -> bool {
        let path_string = match self.relative_path_string(path) {
            Some(path_string) => path_string,
            None => return false,
        };

        let mut has_inclusion_rules = false;
        let mut matches_inclusion_rule = false;
        for rule in &self.rules {
            if rule.include {
                has_inclusion_rules = true;
                matches_inclusion_rule |= rule.pattern.matches(&path_string);
            } else if rule.pattern.matches(&path_string) {
                return false;
            }
        }
        matches_inclusion_rule || !has_inclusion_rules
    }

    fn add_rule(&mut self, pattern: glob::Pattern, include: bool) {
        match self.rules.iter_mut().find(|rule| rule.pattern == pattern) {
            Some(existing_rule) => existing_rule.include = include,
            None => self.rules.push(PatternRule { pattern, include }),
        }
    }

    fn relative_path_string(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base).ok()?;
        let components: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();

        Some(format!("/{}", components.join("/")))
    }
}

impl OfflineSynchronizerFilter for PatternFilter {
    fn should_pend(
        &self,
        path: &Path,
        _change_type: OfflineChangeType,
        _server_item_type: Option<ItemType>,
    ) -> bool {
        self.is_included(path)
    }

    fn should_recurse(&self, directory: &Path) -> bool {
        self.is_included(directory)
    }
}
