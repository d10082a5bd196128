use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    decomposer::DecomposerConfig, error::ReasoningError, pathfinder::SearchConfig,
    walker::WalkParams,
};

/// Flat runtime configuration for one reasoning call.
///
/// Every field has a serde default, so a TOML file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Heuristic weight of the first hypothesis.
    #[serde(default = "default_heuristic_weight")]
    pub heuristic_weight: f64,
    /// Expansion bound per search.
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
    /// Beam width inside a single search; zero for exact A*.
    #[serde(default)]
    pub search_beam_width: usize,
    /// Edges rated below this are invisible to search.
    #[serde(default)]
    pub min_elo: f64,
    /// Edges observed fewer times are invisible to search.
    #[serde(default)]
    pub min_observations: u64,
    /// Parallel hypotheses per Act round.
    #[serde(default = "default_beam_width")]
    pub beam_width: usize,
    /// Intentions kept after prioritization.
    #[serde(default = "default_max_intentions")]
    pub max_intentions: usize,
    /// Walk energy at the start of a passage.
    #[serde(default = "default_initial_energy")]
    pub initial_energy: f64,
    /// Walk energy spent per step.
    #[serde(default = "default_energy_decay")]
    pub energy_decay: f64,
    /// Walk temperature before annealing.
    #[serde(default = "default_temperature_start")]
    pub temperature_start: f64,
    /// Lowest walk temperature.
    #[serde(default = "default_temperature_floor")]
    pub temperature_floor: f64,
    /// Step budget of each walk.
    #[serde(default = "default_walk_max_steps")]
    pub walk_max_steps: usize,
    /// Quality a hypothesis needs to skip reflexion.
    #[serde(default = "default_min_path_quality")]
    pub min_path_quality: f64,
    /// Extra Act rounds allowed after the first.
    #[serde(default = "default_max_reflexion_rounds")]
    pub max_reflexion_rounds: usize,
    /// Words kept in the response.
    #[serde(default = "default_max_response_words")]
    pub max_response_words: usize,
    /// Appends path markers and attaches a trace.
    #[serde(default)]
    pub enable_trace: bool,
    /// Decomposition depth cap.
    #[serde(default = "default_max_decompose_depth")]
    pub max_decompose_depth: usize,
    /// Entries per text/position cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Fixed RNG seed; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_heuristic_weight() -> f64 {
    1.0
}

fn default_max_expansions() -> usize {
    10_000
}

fn default_beam_width() -> usize {
    3
}

fn default_max_intentions() -> usize {
    8
}

fn default_initial_energy() -> f64 {
    1.0
}

fn default_energy_decay() -> f64 {
    0.08
}

fn default_temperature_start() -> f64 {
    1.0
}

fn default_temperature_floor() -> f64 {
    0.1
}

fn default_walk_max_steps() -> usize {
    24
}

fn default_min_path_quality() -> f64 {
    0.5
}

fn default_max_reflexion_rounds() -> usize {
    2
}

fn default_max_response_words() -> usize {
    120
}

fn default_max_decompose_depth() -> usize {
    3
}

fn default_cache_capacity() -> usize {
    4_096
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            heuristic_weight: default_heuristic_weight(),
            max_expansions: default_max_expansions(),
            search_beam_width: 0,
            min_elo: 0.0,
            min_observations: 0,
            beam_width: default_beam_width(),
            max_intentions: default_max_intentions(),
            initial_energy: default_initial_energy(),
            energy_decay: default_energy_decay(),
            temperature_start: default_temperature_start(),
            temperature_floor: default_temperature_floor(),
            walk_max_steps: default_walk_max_steps(),
            min_path_quality: default_min_path_quality(),
            max_reflexion_rounds: default_max_reflexion_rounds(),
            max_response_words: default_max_response_words(),
            enable_trace: false,
            max_decompose_depth: default_max_decompose_depth(),
            cache_capacity: default_cache_capacity(),
            seed: None,
        }
    }
}

impl ReasoningConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading reasoning config {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating {}", path.display()))?;
        Ok(config)
    }

    /// Rejects values the engines cannot work with.
    pub fn validate(&self) -> Result<(), ReasoningError> {
        let invalid = |reason: &str| Err(ReasoningError::InvalidConfig(reason.to_string()));
        if !self.heuristic_weight.is_finite() || self.heuristic_weight < 0.0 {
            return invalid("heuristic_weight must be finite and non-negative");
        }
        if self.max_expansions == 0 {
            return invalid("max_expansions must be at least 1");
        }
        if !self.min_elo.is_finite() || self.min_elo < 0.0 {
            return invalid("min_elo must be finite and non-negative");
        }
        if self.beam_width == 0 {
            return invalid("beam_width must be at least 1");
        }
        if self.max_intentions == 0 {
            return invalid("max_intentions must be at least 1");
        }
        if !(self.initial_energy > 0.0 && self.initial_energy <= 1.0) {
            return invalid("initial_energy must be within (0, 1]");
        }
        if !(0.0..=1.0).contains(&self.energy_decay) {
            return invalid("energy_decay must be within [0, 1]");
        }
        if !(self.temperature_floor > 0.0) || self.temperature_start < self.temperature_floor {
            return invalid("temperatures must satisfy 0 < floor <= start");
        }
        if self.walk_max_steps == 0 {
            return invalid("walk_max_steps must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.min_path_quality) {
            return invalid("min_path_quality must be within [0, 1]");
        }
        if self.max_response_words == 0 {
            return invalid("max_response_words must be at least 1");
        }
        if self.cache_capacity == 0 {
            return invalid("cache_capacity must be at least 1");
        }
        Ok(())
    }

    /// Search options of the first round.
    #[must_use]
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            heuristic_weight: self.heuristic_weight,
            max_expansions: self.max_expansions,
            beam_width: self.search_beam_width,
            min_elo: self.min_elo,
            min_observations: self.min_observations,
        }
    }

    /// Walk parameters; weights not exposed here keep their defaults.
    #[must_use]
    pub fn walk_params(&self) -> WalkParams {
        WalkParams {
            initial_energy: self.initial_energy,
            energy_decay: self.energy_decay,
            temperature_start: self.temperature_start,
            temperature_floor: self.temperature_floor,
            max_steps: self.walk_max_steps,
            ..WalkParams::default()
        }
    }

    /// Decomposer options.
    #[must_use]
    pub fn decomposer_config(&self) -> DecomposerConfig {
        DecomposerConfig {
            max_depth: self.max_decompose_depth,
            ..DecomposerConfig::default()
        }
    }
}
