use serde::{Deserialize, Serialize};

/// The kind of upstream a `SourceDescriptor` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Api,
    Scrape,
    Feed,
    Local,
    /// Synthesized/seeded data. Never
    /// mixed into live results unless explicitly enabled.
    Seeded,
}

impl SourceKind {
    /// Default per-source timeout.
    pub fn default_timeout(self) -> std::time::Duration {
        use std::time::Duration;
        match self {
            SourceKind::Api => Duration::from_secs(30),
            SourceKind::Scrape => Duration::from_secs(60),
            SourceKind::Feed => Duration::from_secs(15),
            SourceKind::Local => Duration::from_secs(5),
            SourceKind::Seeded => Duration::from_secs(5),
        }
    }

    /// Source-weight contribution to the freshness manager's priority
    /// formula.
    pub fn freshness_weight(self) -> f64 {
        match self {
            SourceKind::Api | SourceKind::Seeded => 1.5,
            SourceKind::Feed => 1.2,
            SourceKind::Scrape => 1.0,
            SourceKind::Local => 0.5,
        }
    }
}

/// Describes one upstream provider: its tag, kind, and dispatch-relevant
/// metadata. Tags are globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub tag: String,
    pub kind: SourceKind,
    pub enabled: bool,
    pub priority: i32,
}

impl SourceDescriptor {
    pub fn new(tag: impl Into<String>, kind: SourceKind, priority: i32) -> Self {
        Self {
            tag: tag.into(),
            kind,
            enabled: true,
            priority,
        }
    }
}
