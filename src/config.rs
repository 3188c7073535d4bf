use serde::{Deserialize, Serialize};

/// Which relevance scorer the service loads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Lexical,
    Neural,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::Lexical => "lexical",
            ScorerKind::Neural => "neural",
        }
    }
}

impl std::str::FromStr for ScorerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" => Ok(ScorerKind::Lexical),
            "neural" => Ok(ScorerKind::Neural),
            other => anyhow::bail!("Unknown scorer kind: {other} (expected 'lexical' or 'neural')"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host the RPC listener binds to
    pub bind_host: String,
    /// RPC listening port
    pub port: u16,
    /// Raw scorer selection; parsed at startup so a bad value fails there
    pub scorer: String,
    /// Maximum number of requests scored at the same time
    pub max_workers: usize,
    /// How long in-flight connections may drain after a stop signal
    pub shutdown_grace_secs: u64,
    /// Optional HTTP admin surface (health + metrics)
    pub admin_addr: Option<String>,
    /// Cross-encoder configuration (neural scorer only)
    pub reranker: RerankerConfig,
}

/// Configuration for the cross-encoder sidecar (e.g. llama-server with a reranker model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL for the reranker API (e.g. "http://127.0.0.1:8082").
    /// Required when the neural scorer is selected.
    pub base_url: Option<String>,
    /// Model name to send in the rerank request.
    pub model: Option<String>,
    /// Request timeout in seconds (capped at 30).
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            timeout_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 50051,
            scorer: ScorerKind::Lexical.as_str().to_string(),
            max_workers: 10,
            shutdown_grace_secs: 10,
            admin_addr: None,
            reranker: RerankerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("RERANK_BIND_HOST") {
            config.bind_host = host;
        }
        if let Some(val) = lookup("RERANK_PORT") {
            if let Ok(v) = val.trim().parse() {
                config.port = v;
            }
        }
        if let Some(scorer) = lookup("RERANK_SCORER") {
            config.scorer = scorer;
        }
        if let Some(val) = lookup("RERANK_MAX_WORKERS") {
            if let Ok(v) = val.trim().parse::<usize>() {
                config.max_workers = v.max(1);
            }
        }
        if let Some(val) = lookup("RERANK_SHUTDOWN_GRACE_SECS") {
            if let Ok(v) = val.trim().parse() {
                config.shutdown_grace_secs = v;
            }
        }
        if let Some(addr) = lookup("RERANK_ADMIN_ADDR") {
            if !addr.trim().is_empty() {
                config.admin_addr = Some(addr);
            }
        }

        // Reranker config
        if let Some(url) = lookup("RERANKER_BASE_URL") {
            config.reranker.base_url = Some(url);
        }
        if let Some(model) = lookup("RERANKER_MODEL") {
            config.reranker.model = Some(model);
        }
        if let Some(val) = lookup("RERANKER_TIMEOUT_SECS") {
            if let Ok(v) = val.trim().parse::<u64>() {
                config.reranker.timeout_secs = v.min(30); // Cap at 30s
            }
        }

        config
    }

    pub fn scorer_kind(&self) -> anyhow::Result<ScorerKind> {
        self.scorer.parse()
    }

    pub fn bind_addr(&self) -> String {
        if self.bind_host.contains(':') && !self.bind_host.starts_with('[') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }
}
