//! Demo configuration loaded from TOML
//!
//! Follows the engine's load-with-fallback convention: a missing or invalid
//! file logs the reason and runs with the defaults.

use serde::Deserialize;
use std::path::Path;

/// Parameters of the swimmer demo
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwimmerConfig {
    /// Radius of the spherical boundary mesh
    pub boundary_radius: f64,
    /// Icosphere subdivision passes for the boundary mesh
    pub subdivisions: u32,
    /// Number of swimming agents
    pub agents: usize,
    /// Simulation steps to run
    pub steps: usize,
    /// Radius of each agent
    pub agent_radius: f64,
    /// Travel distance per random-walk step
    pub step_length: f64,
    /// Seed for the random walk
    pub seed: u64,
}

impl Default for SwimmerConfig {
    fn default() -> Self {
        Self {
            boundary_radius: 10.0,
            subdivisions: 2,
            agents: 20,
            steps: 1_000,
            agent_radius: 0.5,
            step_length: 0.8,
            seed: 42,
        }
    }
}

impl SwimmerConfig {
    /// Load the configuration from a TOML file, falling back to the defaults
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("invalid config {}: {err}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }
}
