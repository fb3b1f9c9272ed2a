//! Run configuration.
//!
//! Loading happens in three tiers:
//! 1. TOML file (or built-in defaults)
//! 2. `SPIKE_BRIDGE_*` environment variables
//! 3. CLI overrides applied by the binary
//!
//! followed by [`BridgeConfig::validate`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spike_core::DecodeRule;

use crate::error::ConfigError;

/// Order in which the spike artifact lays out its 2D slices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceAxis {
    /// T blocks of B x F, header `(T, B, F)`.
    #[default]
    Time,
    /// B blocks of T x F, header `(B, T, F)`.
    Sample,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub num_steps: usize,
    pub gain: f32,
    pub seed: u64,
    pub slice_axis: SliceAxis,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            num_steps: 25,
            gain: 1.0,
            seed: 42,
            slice_axis: SliceAxis::Time,
        }
    }
}

/// Artifact locations. Relative paths resolve against `work_dir`, which is
/// also the simulator's working directory.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub work_dir: PathBuf,
    pub input_path: PathBuf,
    pub targets_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            input_path: PathBuf::from("inputSpikes.txt"),
            targets_path: PathBuf::from("targets.txt"),
            output_path: PathBuf::from("output.txt"),
        }
    }
}

impl ArtifactPaths {
    pub fn input(&self) -> PathBuf {
        self.work_dir.join(&self.input_path)
    }

    pub fn targets(&self) -> PathBuf {
        self.work_dir.join(&self.targets_path)
    }

    pub fn output(&self) -> PathBuf {
        self.work_dir.join(&self.output_path)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub executable: PathBuf,
    /// 0 waits indefinitely.
    pub timeout_secs: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("../target/debug/main"),
            timeout_secs: 0,
        }
    }
}

impl SimulatorConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub decode: DecodeRule,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub batch_size: usize,
    /// 0 runs every full batch the dataset provides.
    pub max_batches: usize,
    pub encoder: EncoderConfig,
    pub artifacts: ArtifactPaths,
    pub simulator: SimulatorConfig,
    pub scoring: ScoringConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_batches: 0,
            encoder: EncoderConfig::default(),
            artifacts: ArtifactPaths::default(),
            simulator: SimulatorConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` (or defaults), apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SPIKE_BRIDGE_*` overrides looked up through `lookup`.
    ///
    /// Supported keys:
    /// - `SPIKE_BRIDGE_BATCH_SIZE` -> `batch_size`
    /// - `SPIKE_BRIDGE_NUM_STEPS`  -> `encoder.num_steps`
    /// - `SPIKE_BRIDGE_GAIN`       -> `encoder.gain`
    /// - `SPIKE_BRIDGE_SEED`       -> `encoder.seed`
    /// - `SPIKE_BRIDGE_SIMULATOR`  -> `simulator.executable`
    /// - `SPIKE_BRIDGE_WORK_DIR`   -> `artifacts.work_dir`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPIKE_BRIDGE_BATCH_SIZE") {
            self.batch_size = parse_override("SPIKE_BRIDGE_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("SPIKE_BRIDGE_NUM_STEPS") {
            self.encoder.num_steps = parse_override("SPIKE_BRIDGE_NUM_STEPS", &v)?;
        }
        if let Some(v) = lookup("SPIKE_BRIDGE_GAIN") {
            self.encoder.gain = parse_override("SPIKE_BRIDGE_GAIN", &v)?;
        }
        if let Some(v) = lookup("SPIKE_BRIDGE_SEED") {
            self.encoder.seed = parse_override("SPIKE_BRIDGE_SEED", &v)?;
        }
        if let Some(v) = lookup("SPIKE_BRIDGE_SIMULATOR") {
            self.simulator.executable = PathBuf::from(v);
        }
        if let Some(v) = lookup("SPIKE_BRIDGE_WORK_DIR") {
            self.artifacts.work_dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "must be at least 1"));
        }
        if self.encoder.num_steps == 0 {
            return Err(ConfigError::invalid("encoder.num_steps", "must be at least 1"));
        }
        if !self.encoder.gain.is_finite() || self.encoder.gain < 0.0 {
            return Err(ConfigError::invalid(
                "encoder.gain",
                format!("must be finite and non-negative, got {}", self.encoder.gain),
            ));
        }
        if self.simulator.executable.as_os_str().is_empty() {
            return Err(ConfigError::invalid("simulator.executable", "must not be empty"));
        }

        let artifacts = [
            ("artifacts.input_path", &self.artifacts.input_path),
            ("artifacts.targets_path", &self.artifacts.targets_path),
            ("artifacts.output_path", &self.artifacts.output_path),
        ];
        for (field, path) in artifacts {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }
        for (i, (field, path)) in artifacts.iter().enumerate() {
            if let Some((other, _)) = artifacts[i + 1..].iter().find(|(_, p)| p == path) {
                return Err(ConfigError::invalid(
                    *field,
                    format!("{} is also used by {}", path.display(), other),
                ));
            }
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("cannot parse {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.artifacts.input(), PathBuf::from("./inputSpikes.txt"));
        assert_eq!(config.simulator.timeout(), None);
    }

    #[test]
    fn parses_partial_toml() {
        let config = BridgeConfig::from_toml_str(
            r#"
            batch_size = 250

            [encoder]
            num_steps = 100
            gain = 0.5
            slice_axis = "sample"

            [artifacts]
            work_dir = "simulation"

            [simulator]
            executable = "./snn-sim"
            timeout_secs = 30

            [scoring]
            decode = "argmax"
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 250);
        assert_eq!(config.encoder.num_steps, 100);
        assert_eq!(config.encoder.seed, 42);
        assert_eq!(config.encoder.slice_axis, SliceAxis::Sample);
        assert_eq!(config.artifacts.output(), PathBuf::from("simulation/output.txt"));
        assert_eq!(config.simulator.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.scoring.decode, DecodeRule::ArgMax);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            BridgeConfig::from_toml_str("batch_size = \"many\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(BridgeConfig::from_toml_str("[scoring]\ndecode = \"threshold\"").is_err());
    }

    #[test]
    fn environment_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("SPIKE_BRIDGE_BATCH_SIZE", "8"),
            ("SPIKE_BRIDGE_GAIN", "2.5"),
            ("SPIKE_BRIDGE_SIMULATOR", "/opt/sim"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.encoder.gain, 2.5);
        assert_eq!(config.simulator.executable, PathBuf::from("/opt/sim"));
        assert_eq!(config.encoder.num_steps, 25);
    }

    #[test]
    fn unparsable_override_is_an_error() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_overrides(|k| (k == "SPIKE_BRIDGE_NUM_STEPS").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "SPIKE_BRIDGE_NUM_STEPS", .. }));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = BridgeConfig::default();
        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { field: "batch_size", .. })));

        let mut config = BridgeConfig::default();
        config.encoder.gain = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.artifacts.output_path = PathBuf::from("inputSpikes.txt");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "artifacts.input_path", .. })
        ));
    }
}
