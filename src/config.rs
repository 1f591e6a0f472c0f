//! Configuration for marker tracking and the demo driver.
//!
//! `TrackingConfig` carries the numeric knobs of the localization engine;
//! `DriverConfig` is the TOML-backed setup consumed by `advect_demo`.

use crate::error::MarkerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Numeric parameters of the localization and inverse-mapping machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Convergence tolerance on the Newton step norm (reference space).
    pub newton_tol: f64,
    /// Iteration cap for the inverse isoparametric map.
    pub newton_max_iter: usize,
    /// Slack allowed when testing containment in the reference domain.
    /// Points within this distance outside a face still count as inside,
    /// so markers sitting on shared faces resolve deterministically.
    pub geometric_tol: f64,
    /// Hop cap for the neighbor walk before escalating to brute force.
    pub max_hops: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            newton_tol: 1e-11,
            newton_max_iter: 15,
            geometric_tol: 1e-8,
            max_hops: 64,
        }
    }
}

/// Domain and resolution of the structured demo mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub nx: usize,
    pub ny: usize,
    pub lx: f64,
    pub ly: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            nx: 16,
            ny: 16,
            lx: 1.0,
            ly: 1.0,
        }
    }
}

/// Advection schedule for the demo driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvectionConfig {
    /// Runge-Kutta order (1..=4).
    pub order: usize,
    /// Sub-intervals per macro step.
    pub substeps: usize,
    /// Macro time step.
    pub dt: f64,
    /// Number of macro steps to run.
    pub steps: usize,
}

impl Default for AdvectionConfig {
    fn default() -> Self {
        Self {
            order: 4,
            substeps: 4,
            dt: 0.1,
            steps: 10,
        }
    }
}

/// Marker seeding for the demo driver: a uniform grid of seed points
/// inset from the domain boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub nx: usize,
    pub ny: usize,
    pub margin: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            nx: 4,
            ny: 4,
            margin: 0.2,
        }
    }
}

/// Full configuration of the demo driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub domain: DomainConfig,
    pub advection: AdvectionConfig,
    pub seeds: SeedConfig,
    pub tracking: TrackingConfig,
}

impl DriverConfig {
    /// Load a driver configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MarkerError> {
        let path_str = path.as_ref().display().to_string();
        let contents = fs::read_to_string(&path).map_err(|source| MarkerError::ConfigIo {
            path: path_str.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|e| MarkerError::ConfigParse {
            path: path_str,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = TrackingConfig::default();
        assert!(cfg.newton_tol > 0.0);
        assert!(cfg.newton_max_iter >= 10);
        assert!(cfg.max_hops > 0);
    }

    #[test]
    fn parse_partial_toml() {
        let text = r#"
            [domain]
            nx = 8
            ny = 8

            [advection]
            order = 2
        "#;
        let cfg: DriverConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.domain.nx, 8);
        assert_eq!(cfg.advection.order, 2);
        // Unspecified sections fall back to defaults.
        assert_eq!(cfg.advection.substeps, 4);
        assert_eq!(cfg.seeds.nx, 4);
    }
}
