use std::env;

use crate::error::EngineError;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Self-consistency limits.
    pub consensus: ConsensusConfig,
    /// Decision-tree limits.
    pub tree: TreeConfig,
    /// Logging preferences, consumed by the embedding application.
    pub logging: LoggingConfig,
}

/// Self-consistency (consensus) configuration
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Paths to run when the caller does not specify a count.
    pub default_paths: usize,
    /// Upper bound on caller-requested path counts.
    pub max_paths: usize,
    /// Concurrent generation passes allowed at once.
    pub max_concurrency: usize,
}

/// Decision-tree configuration
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Upper bound on caller-requested tree depth. Each level can fan out
    /// into up to `max_branching` generation calls, so this stays small.
    pub max_depth: usize,
    /// Options kept per node (the builder truncates beyond this).
    pub max_branching: usize,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter, e.g. "info".
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// Structured JSON output.
    Json,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, EngineError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let consensus = ConsensusConfig {
            default_paths: env::var("CONSENSUS_DEFAULT_PATHS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            max_paths: env::var("CONSENSUS_MAX_PATHS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_concurrency: env::var("CONSENSUS_MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        };

        let tree = TreeConfig {
            max_depth: env::var("TREE_MAX_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            max_branching: env::var("TREE_MAX_BRANCHING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let config = EngineConfig {
            consensus,
            tree,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate limit values.
    ///
    /// Path counts, tree depth, and branching factors have no natural upper
    /// bound in the problem itself; they bound generation-call fan-out
    /// (worst case ~ branching^depth calls), so out-of-range values are
    /// rejected instead of silently clamped.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.consensus.default_paths < 2 {
            return Err(EngineError::Config {
                message: "CONSENSUS_DEFAULT_PATHS must be at least 2".to_string(),
            });
        }
        if self.consensus.max_paths < self.consensus.default_paths {
            return Err(EngineError::Config {
                message: "CONSENSUS_MAX_PATHS must be >= CONSENSUS_DEFAULT_PATHS".to_string(),
            });
        }
        if self.consensus.max_concurrency == 0 {
            return Err(EngineError::Config {
                message: "CONSENSUS_MAX_CONCURRENCY must be at least 1".to_string(),
            });
        }
        if self.tree.max_depth == 0 || self.tree.max_depth > 6 {
            return Err(EngineError::Config {
                message: "TREE_MAX_DEPTH must be between 1 and 6".to_string(),
            });
        }
        if self.tree.max_branching < 2 || self.tree.max_branching > 4 {
            return Err(EngineError::Config {
                message: "TREE_MAX_BRANCHING must be between 2 and 4".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            consensus: ConsensusConfig::default(),
            tree: TreeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            default_paths: 3,
            max_paths: 10,
            max_concurrency: 4,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_branching: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
