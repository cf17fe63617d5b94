use super::search::SearchRequest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub thread_count: usize,
    pub show_result_notifications: bool,
    pub min_term_len: usize,
    /// Folders every search is scoped to. Empty searches the whole tree.
    pub search_roots: Vec<String>,
    pub default_options: SearchOptions,
    pub saved_searches: Vec<SavedSearch>,
}

/// Program and flag spelling of the external engine.
///
/// Defaults follow ripgrep; any tool that emits the same JSON-lines event
/// stream can be plugged in by overriding these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub program: String,
    pub json: String,
    pub threads: String,
    pub ignore_case: String,
    pub smart_case: String,
    pub multiline: String,
    pub fixed_strings: String,
    pub glob: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub ignore_case: bool,
    pub literal: bool,
    pub multiline: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_roots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub name: String,
    pub term: String,
    #[serde(default)]
    pub options: SearchOptions,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            program: "rg".to_string(),
            json: "--json".to_string(),
            threads: "-j".to_string(),
            ignore_case: "-i".to_string(),
            smart_case: "-S".to_string(),
            multiline: "--multiline".to_string(),
            fixed_strings: "-F".to_string(),
            glob: "-g".to_string(),
            pattern: "-e".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            thread_count: 4,
            show_result_notifications: true,
            min_term_len: 3,
            search_roots: Vec::new(),
            default_options: SearchOptions::default(),
            saved_searches: Vec::new(),
        }
    }
}

impl Settings {
    pub fn request(
        &self,
        term: impl Into<String>,
        working_dir: Option<PathBuf>,
        options: &SearchOptions,
    ) -> SearchRequest {
        let mut request = SearchRequest::new(term)
            .with_ignore_case(options.ignore_case)
            .with_literal(options.literal)
            .with_multiline(options.multiline)
            .with_include(options.include_types.iter().cloned())
            .with_exclude(options.exclude_types.iter().cloned())
            .with_concurrency(self.thread_count.max(1));
        for root in self.search_roots.iter().chain(&options.extra_roots) {
            request = request.with_root(root.clone());
        }
        if let Some(dir) = working_dir {
            request = request.with_working_dir(dir);
        }
        request
    }

    pub fn find_saved(&self, name: &str) -> Option<&SavedSearch> {
        self.saved_searches.iter().find(|s| s.name == name)
    }

    /// Adds a saved search, replacing any existing one with the same name.
    pub fn add_saved_search(&mut self, search: SavedSearch) {
        match self.saved_searches.iter_mut().find(|s| s.name == search.name) {
            Some(existing) => *existing = search,
            None => self.saved_searches.push(search),
        }
    }

    pub fn remove_saved_search(&mut self, name: &str) -> bool {
        let before = self.saved_searches.len();
        self.saved_searches.retain(|s| s.name != name);
        self.saved_searches.len() != before
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/settings.rs"]
mod tests;
