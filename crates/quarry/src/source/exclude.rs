//! Exclusion rules applied to fetched repositories.

use std::collections::HashSet;

use regex::Regex;

use super::config::ExcludeRule;
use super::errors::SourceError;
use super::pager::ProviderRepo;

/// Compiled form of a connection's exclusion rules.
#[derive(Debug, Default, Clone)]
pub struct ExclusionFilter {
    names: HashSet<String>,
    ids: HashSet<String>,
    patterns: Vec<Regex>,
}

impl ExclusionFilter {
    /// Compile `rules`. Fails on the first pattern that is not a valid regex.
    pub fn new(rules: &[ExcludeRule]) -> Result<Self, SourceError> {
        let mut filter = Self::default();

        for rule in rules {
            if let Some(name) = rule.name.as_deref().filter(|n| !n.is_empty()) {
                filter.names.insert(name.to_lowercase());
            }
            if let Some(id) = rule.id {
                filter.ids.insert(id.to_string());
            }
            if let Some(uuid) = rule.uuid.as_deref().filter(|u| !u.is_empty()) {
                filter.ids.insert(uuid.to_string());
            }
            if let Some(pattern) = rule.pattern.as_deref().filter(|p| !p.is_empty()) {
                let re = Regex::new(pattern).map_err(|source| {
                    SourceError::InvalidExcludePattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                filter.patterns.push(re);
            }
        }

        Ok(filter)
    }

    /// Whether no rule can ever match.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.ids.is_empty() && self.patterns.is_empty()
    }

    /// Whether `repo` matches any rule.
    pub fn should_exclude<R: ProviderRepo>(&self, repo: &R) -> bool {
        let full_name = repo.full_name();

        if !self.names.is_empty() && self.names.contains(&full_name.to_lowercase()) {
            return true;
        }
        if self.ids.contains(repo.external_id()) {
            return true;
        }
        self.patterns.iter().any(|re| re.is_match(full_name))
    }
}
