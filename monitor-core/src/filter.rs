use serde::{Deserialize, Serialize};
use wildmatch::WildMatch;

/// Host patterns deciding which exchanges get captured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub allow: Vec<String>,
    pub block: Vec<String>,
}

/// Compiled capture scope
#[derive(Debug, Clone, Default)]
pub struct ScopeMatcher {
    allow_list: Vec<WildMatch>,
    block_list: Vec<WildMatch>,
}

impl ScopeMatcher {
    pub fn new(allow_list: Vec<String>, block_list: Vec<String>) -> Self {
        Self {
            allow_list: allow_list.iter().map(|p| WildMatch::new(p)).collect(),
            block_list: block_list.iter().map(|p| WildMatch::new(p)).collect(),
        }
    }

    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(config.allow.clone(), config.block.clone())
    }

    /// Whether no pattern restricts capture
    pub fn is_unrestricted(&self) -> bool {
        self.allow_list.is_empty() && self.block_list.is_empty()
    }

    /// Check if a host is in capture scope
    ///
    /// Block list wins over allow list; an empty allow list admits every host
    /// that is not blocked. A `:port` suffix is ignored when matching.
    pub fn is_allowed(&self, host: &str) -> bool {
        let host = strip_port(host);

        if self.block_list.iter().any(|pattern| pattern.matches(host)) {
            return false;
        }

        self.allow_list.is_empty() || self.allow_list.iter().any(|pattern| pattern.matches(host))
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        // leave bracketed IPv6 literals without a port alone
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
