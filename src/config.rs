//! Configuration loading.
//!
//! Merges in order:
//! 1. `anteater.yml` (base configuration)
//! 2. `anteater.local.yml` (local overrides, git-ignored)
//! 3. `ANTEATER_`-prefixed environment variables
//!
//! All recognized keys live under a single top-level `anteater:` key.
//! Unknown top-level keys under `anteater` are ignored for forward
//! compatibility unless `anteater.strict: true` is set, in which case they
//! are reported as a [`ConfigError::UnknownKey`].

use std::collections::HashMap;
use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debt::{DebtConfig, DebtUnit, MetricThresholds as DebtMetricThresholds, Multipliers};

const KNOWN_KEYS: &[&str] = &["exclude", "rules", "metrics", "debt", "strict"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("unrecognized configuration key `anteater.{0}` (set `strict: false` to ignore)")]
    UnknownKey(String),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One entry of the `rules:` list: either a bare rule id (enabled with
/// default severity/no excludes) or a single-key map overriding a rule's
/// severity and/or exclude globs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RuleSpec {
    Enabled(String),
    Overridden(HashMap<String, RuleOverride>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RuleOverride {
    pub severity: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MetricThresholdsConfig {
    #[serde(default = "default_cc")]
    pub cyclomatic_complexity: u32,
    #[serde(default = "default_cognitive")]
    pub cognitive_complexity: u32,
    #[serde(default = "default_mi")]
    pub maintainability_index: u32,
    #[serde(default = "default_sloc")]
    pub source_lines_of_code: u32,
    #[serde(default = "default_nesting")]
    pub maximum_nesting: u32,
    #[serde(default = "default_params")]
    pub number_of_parameters: u32,
    #[serde(default = "default_methods")]
    pub number_of_methods: u32,
    #[serde(default = "default_halstead_volume")]
    pub halstead_volume: u32,
}

fn default_cc() -> u32 {
    20
}
fn default_cognitive() -> u32 {
    15
}
fn default_mi() -> u32 {
    50
}
fn default_sloc() -> u32 {
    50
}
fn default_nesting() -> u32 {
    5
}
fn default_params() -> u32 {
    4
}
fn default_methods() -> u32 {
    20
}
fn default_halstead_volume() -> u32 {
    150
}

impl Default for MetricThresholdsConfig {
    fn default() -> Self {
        MetricThresholdsConfig {
            cyclomatic_complexity: default_cc(),
            cognitive_complexity: default_cognitive(),
            maintainability_index: default_mi(),
            source_lines_of_code: default_sloc(),
            maximum_nesting: default_nesting(),
            number_of_parameters: default_params(),
            number_of_methods: default_methods(),
            halstead_volume: default_halstead_volume(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DebtUnitConfig {
    Hours,
    Days,
    StoryPoints,
}

impl Default for DebtUnitConfig {
    fn default() -> Self {
        DebtUnitConfig::Hours
    }
}

impl From<DebtUnitConfig> for DebtUnit {
    fn from(value: DebtUnitConfig) -> Self {
        match value {
            DebtUnitConfig::Hours => DebtUnit::Hours,
            DebtUnitConfig::Days => DebtUnit::Days,
            DebtUnitConfig::StoryPoints => DebtUnit::StoryPoints,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultipliersConfig {
    #[serde(default = "default_critical_mult")]
    pub critical: f64,
    #[serde(default = "default_high_mult")]
    pub high: f64,
    #[serde(default = "default_medium_mult")]
    pub medium: f64,
    #[serde(default = "default_low_mult")]
    pub low: f64,
}

fn default_critical_mult() -> f64 {
    4.0
}
fn default_high_mult() -> f64 {
    2.0
}
fn default_medium_mult() -> f64 {
    1.0
}
fn default_low_mult() -> f64 {
    0.5
}

impl Default for MultipliersConfig {
    fn default() -> Self {
        MultipliersConfig { critical: default_critical_mult(), high: default_high_mult(), medium: default_medium_mult(), low: default_low_mult() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DebtMetricThresholdsConfig {
    #[serde(default = "default_debt_mi")]
    pub maintainability_index: f64,
    #[serde(default = "default_cc")]
    pub cyclomatic_complexity: u32,
    #[serde(default = "default_cognitive")]
    pub cognitive_complexity: u32,
    #[serde(default = "default_debt_loc")]
    pub lines_of_code: u32,
}

fn default_debt_mi() -> f64 {
    50.0
}
fn default_debt_loc() -> u32 {
    100
}

impl Default for DebtMetricThresholdsConfig {
    fn default() -> Self {
        DebtMetricThresholdsConfig {
            maintainability_index: default_debt_mi(),
            cyclomatic_complexity: default_cc(),
            cognitive_complexity: default_cognitive(),
            lines_of_code: default_debt_loc(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtConfigToml {
    #[serde(default)]
    pub unit: DebtUnitConfig,
    #[serde(default = "default_debt_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub costs: HashMap<String, f64>,
    #[serde(default)]
    pub multipliers: MultipliersConfig,
    #[serde(default)]
    pub metrics: DebtMetricThresholdsConfig,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_debt_threshold() -> f64 {
    40.0
}

impl Default for DebtConfigToml {
    fn default() -> Self {
        DebtConfigToml {
            unit: DebtUnitConfig::default(),
            threshold: default_debt_threshold(),
            costs: HashMap::new(),
            multipliers: MultipliersConfig::default(),
            metrics: DebtMetricThresholdsConfig::default(),
            exclude: Vec::new(),
        }
    }
}

impl From<DebtConfigToml> for DebtConfig {
    fn from(value: DebtConfigToml) -> Self {
        DebtConfig {
            unit: value.unit.into(),
            threshold: value.threshold,
            costs: value.costs,
            multipliers: Multipliers {
                critical: value.multipliers.critical,
                high: value.multipliers.high,
                medium: value.multipliers.medium,
                low: value.multipliers.low,
            },
            metrics: DebtMetricThresholds {
                maintainability_index: value.metrics.maintainability_index,
                cyclomatic_complexity: value.metrics.cyclomatic_complexity,
                cognitive_complexity: value.metrics.cognitive_complexity,
                lines_of_code: value.metrics.lines_of_code,
            },
            exclude: value.exclude,
        }
    }
}

/// The fully-resolved `anteater.*` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub metrics: MetricThresholdsConfig,
    #[serde(default)]
    pub debt: DebtConfigToml,
    #[serde(default)]
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config { exclude: Vec::new(), rules: Vec::new(), metrics: MetricThresholdsConfig::default(), debt: DebtConfigToml::default(), strict: false }
    }
}

#[derive(Debug, Deserialize)]
struct Wrapper {
    #[serde(default)]
    anteater: serde_json::Value,
}

fn check_unknown_keys(raw: &serde_json::Value) -> Result<(), ConfigError> {
    let Some(map) = raw.as_object() else { return Ok(()) };
    let strict = map.get("strict").and_then(|v| v.as_bool()).unwrap_or(false);
    if !strict {
        return Ok(());
    }
    for key in map.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(ConfigError::UnknownKey(key.clone()));
        }
    }
    Ok(())
}

impl Config {
    /// Loads from the default file locations in the current directory,
    /// merged with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("anteater.yml"), Path::new("anteater.local.yml"))
    }

    pub fn load_from(base: &Path, local: &Path) -> Result<Self, ConfigError> {
        let figment = Figment::new().merge(Yaml::file(base)).merge(Yaml::file(local)).merge(Env::prefixed("ANTEATER_").split("__"));
        Self::extract(figment)
    }

    /// Loads from a single explicit file path plus environment overrides.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new().merge(Yaml::file(path)).merge(Env::prefixed("ANTEATER_").split("__"));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let wrapper: Wrapper = figment.extract()?;
        check_unknown_keys(&wrapper.anteater)?;
        if wrapper.anteater.is_null() {
            return Ok(Config::default());
        }
        Ok(serde_json::from_value(wrapper.anteater)?)
    }
}
