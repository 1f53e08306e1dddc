//! Episode identifiers.
//!
//! An episode links a sequence of related decision requests (one puzzle
//! attempt, one agent conversation) and the feedback later submitted for it.
//! The remote service allocates the id on the first call; orchestrators only
//! thread it through.

use serde::{Deserialize, Serialize};

/// Opaque, service-assigned episode token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(String);

impl EpisodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_string() {
        let id = EpisodeId::new("0192f1b4-episode");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0192f1b4-episode\"");
        let back: EpisodeId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back.as_str(), "abc");
    }
}
