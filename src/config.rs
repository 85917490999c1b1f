use crate::dnssec::{AlgorithmSet, DnsSecAlgorithm, TrustAnchorSet};
use crate::error::{AuthGraphError, Result};
use crate::graph::BuildOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// The input came from a recursive analysis: graph every answer of a
    /// response, not only those owned by the query name
    pub recursive: bool,

    /// Maximum number of nested CNAME targets to follow
    pub max_chain_depth: usize,

    /// Algorithms the trust propagator treats as understood. An empty list
    /// in the environment or a config file selects the default set.
    pub supported_algorithms: AlgorithmSet,

    /// Seed with the built-in root KSK when no trust anchors are configured
    pub use_root_anchor: bool,

    /// Trust anchor file (DNSKEY or DS presentation lines)
    pub trust_anchor_file: Option<PathBuf>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            max_chain_depth: 16,
            supported_algorithms: AlgorithmSet::default(),
            use_root_anchor: true,
            trust_anchor_file: None,
        }
    }
}

/// On-disk form; every field is optional and falls back to the default
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    recursive: Option<bool>,
    max_chain_depth: Option<usize>,
    supported_algorithms: Option<Vec<u8>>,
    use_root_anchor: Option<bool>,
    trust_anchor_file: Option<PathBuf>,
}

impl GraphConfig {
    /// Create a GraphConfig from environment variables
    /// Returns Err if the resulting configuration is invalid
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `AUTHGRAPH_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(recursive) = std::env::var("AUTHGRAPH_RECURSIVE") {
            self.recursive = parse_bool(&recursive, false);
        }

        if let Ok(depth) = std::env::var("AUTHGRAPH_MAX_CHAIN_DEPTH") {
            self.max_chain_depth = depth.trim().parse::<usize>().map_err(|_| {
                AuthGraphError::InvalidConfig(format!("Invalid max chain depth: {}", depth))
            })?;
        }

        if let Ok(algorithms) = std::env::var("AUTHGRAPH_SUPPORTED_ALGORITHMS") {
            self.supported_algorithms = parse_algorithms(&algorithms)?;
        }

        if let Ok(use_root) = std::env::var("AUTHGRAPH_USE_ROOT_ANCHOR") {
            self.use_root_anchor = parse_bool(&use_root, true);
        }

        if let Ok(path) = std::env::var("AUTHGRAPH_TRUST_ANCHOR_FILE") {
            if !path.trim().is_empty() {
                self.trust_anchor_file = Some(PathBuf::from(path.trim()));
            }
        }

        Ok(())
    }

    /// Parse a TOML configuration document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = Self::default();
        let config = Self {
            recursive: file.recursive.unwrap_or(defaults.recursive),
            max_chain_depth: file.max_chain_depth.unwrap_or(defaults.max_chain_depth),
            supported_algorithms: file
                .supported_algorithms
                .filter(|list| !list.is_empty())
                .map(AlgorithmSet::new)
                .unwrap_or(defaults.supported_algorithms),
            use_root_anchor: file.use_root_anchor.unwrap_or(defaults.use_root_anchor),
            trust_anchor_file: file.trust_anchor_file,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chain_depth == 0 || self.max_chain_depth > 64 {
            return Err(AuthGraphError::InvalidConfig(format!(
                "Max chain depth must be between 1 and 64, got {}",
                self.max_chain_depth
            )));
        }

        if let Some(unknown) = self
            .supported_algorithms
            .iter()
            .find(|&alg| DnsSecAlgorithm::from_u8(alg).is_none())
        {
            return Err(AuthGraphError::InvalidConfig(format!(
                "Unknown DNSSEC algorithm: {}",
                unknown
            )));
        }

        Ok(())
    }

    /// Trust anchors to seed propagation with: the anchor file when one is
    /// configured, otherwise the built-in root anchor if enabled
    pub fn trust_anchors(&self) -> Result<TrustAnchorSet> {
        if let Some(path) = &self.trust_anchor_file {
            let anchors = TrustAnchorSet::from_file(path)?;
            info!(
                path = %path.display(),
                zones = anchors.zone_count(),
                "Loaded trust anchors"
            );
            return Ok(anchors);
        }
        if self.use_root_anchor {
            debug!("Using built-in root trust anchor");
            return Ok(TrustAnchorSet::with_root_anchor());
        }
        Ok(TrustAnchorSet::new())
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            recursive: self.recursive,
            max_chain_depth: self.max_chain_depth,
        }
    }
}

/// Parse a comma separated list of algorithm numbers
fn parse_algorithms(list: &str) -> Result<AlgorithmSet> {
    let algorithms: std::result::Result<Vec<u8>, _> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .map_err(|_| AuthGraphError::InvalidConfig(format!("Invalid algorithm: {}", s)))
        })
        .collect();
    let algorithms = algorithms?;
    if algorithms.is_empty() {
        return Ok(AlgorithmSet::default());
    }
    Ok(AlgorithmSet::new(algorithms))
}

/// Parse a boolean from a string, with a default value for invalid input
fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}
