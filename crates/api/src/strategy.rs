//! The available orchestration strategies.

/// Selects how a batch drives its fetches.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// One fetch at a time, in key order.
    Sequential,

    /// One concurrent fetch per key, joined before returning.
    FanOut,

    /// Concurrent producers feed a bounded queue drained by one consumer.
    BoundedQueue,

    /// Like [Strategy::FanOut], but with at most `max_concurrency`
    /// fetches in flight.
    BoundedConcurrency,
}

impl Strategy {
    /// All strategies, in declaration order.
    pub const ALL: [Strategy; 4] = [
        Strategy::Sequential,
        Strategy::FanOut,
        Strategy::BoundedQueue,
        Strategy::BoundedConcurrency,
    ];

    /// A stable name for logs and command lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::FanOut => "fan-out",
            Self::BoundedQueue => "bounded-queue",
            Self::BoundedConcurrency => "bounded-concurrency",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = crate::BfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| {
                crate::BfError::other(format!("unknown strategy: {s}"))
            })
    }
}
