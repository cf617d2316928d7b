//! Rules steering how declarations are classified

use serde::{Deserialize, Serialize};

/// Type-name patterns that turn a `const`/`static` into a component.
///
/// A pattern matches when it occurs anywhere in the resolved type path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorRules {
    pub listener_patterns: Vec<String>,
    pub connection_patterns: Vec<String>,
}

impl Default for ExtractorRules {
    fn default() -> Self {
        ExtractorRules {
            listener_patterns: ["Listener", "Acceptor", "UdpSocket"]
                .map(String::from)
                .to_vec(),
            connection_patterns: ["Client", "Pool", "Connection", "Session"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ExtractorRules {
    pub fn is_listener(&self, resolved_type: &str) -> bool {
        matches_any(&self.listener_patterns, resolved_type)
    }

    pub fn is_connection(&self, resolved_type: &str) -> bool {
        matches_any(&self.connection_patterns, resolved_type)
    }
}

fn matches_any(patterns: &[String], resolved_type: &str) -> bool {
    patterns
        .iter()
        .any(|p| !p.is_empty() && resolved_type.contains(p.as_str()))
}
