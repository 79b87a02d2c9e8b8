//! Configuration system for the decoupled front end.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the front end. It provides:
//! 1. **Defaults:** Baseline queue bounds, fetch bandwidth, sizing thresholds and
//!    fusion table geometry.
//! 2. **Structures:** Hierarchical config for general, FTQ, sizing and fusion settings.
//! 3. **Enums:** The adaptive sizing mode.
//!
//! Configuration is read-only after startup. It is supplied as JSON by the
//! surrounding simulator or built with `Config::default()`.

use serde::Deserialize;

use crate::common::ConfigError;
use crate::common::constants::MAX_FUSION_WAYS;

/// Default configuration constants for the front end.
///
/// These values define the baseline configuration when not explicitly
/// overridden in the JSON configuration.
mod defaults {
    /// Number of simulated cores.
    pub const NUM_CORES: usize = 1;

    /// Consecutive cycles without a fetched op before the watchdog fires.
    pub const WATCHDOG_CYCLES: u64 = 100_000;

    /// Initial FTQ capacity in fetch targets.
    pub const FTQ_CAPACITY: usize = 32;

    /// Lower bound the sizing controller may shrink the FTQ to.
    pub const FTQ_MIN_CAPACITY: usize = 4;

    /// Upper bound the sizing controller may grow the FTQ to.
    pub const FTQ_MAX_CAPACITY: usize = 128;

    /// Taken control-flow ops (and fetch barriers) admitted per cycle.
    pub const TAKEN_CFS_PER_CYCLE: u64 = 2;

    /// Instruction bytes admitted per cycle.
    ///
    /// Compared with `>=` since instruction sizes need not divide it evenly.
    pub const BYTES_PER_CYCLE: u64 = 64;

    /// Instruction cache line size in bytes; a fetch target never spans two lines.
    pub const ICACHE_LINE_BYTES: u64 = 64;

    /// Utility ratio the utility-driven controller steers towards.
    pub const UTILITY_THRESHOLD: f64 = 0.70;

    /// Timeliness ratio the timeliness-driven controller steers towards.
    pub const TIMELINESS_THRESHOLD: f64 = 0.77;

    /// Combined-mode blend: coefficient of `qU`.
    pub const BLEND_U: f64 = -2.3;

    /// Combined-mode blend: coefficient of `qT`.
    pub const BLEND_T: f64 = -31.2;

    /// Combined-mode blend: coefficient of `qU²`.
    pub const BLEND_UU: f64 = 0.007;

    /// Combined-mode blend: coefficient of `qT²`.
    pub const BLEND_TT: f64 = 0.1;

    /// Combined-mode blend: coefficient of `qU·qT`.
    pub const BLEND_UT: f64 = 0.3;

    /// Sets per fusion-predictor table.
    pub const FUSION_SETS: usize = 256;

    /// Ways per fusion-predictor set.
    pub const FUSION_WAYS: usize = 4;

    /// Entries in the tournament selector table.
    pub const FUSION_SELECTOR_ENTRIES: usize = 2048;

    /// Entries in the unfused-committed history for loads.
    pub const LOAD_HISTORY_ENTRIES: usize = 6;

    /// Cacheline granularity used to build history tags.
    pub const CACHELINE_BYTES: u64 = 64;

    /// Width of the global fusion-outcome history register.
    pub const FUSION_HISTORY_BITS: u32 = 12;
}

/// Adaptive FTQ sizing policies.
///
/// Selects which feedback ratio drives the capacity controller at recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SizingMode {
    /// Capacity stays at its initial value.
    #[default]
    Disabled,
    /// Capacity follows the utility ratio (fraction of fetched ops later useful).
    Utility,
    /// Capacity follows the timeliness ratio (fraction fetched ahead of need).
    Timeliness,
    /// Capacity is a quadratic blend of the utility and timeliness candidates.
    Combined,
}

/// Root configuration structure containing all front-end settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use fdip_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.general.num_cores, 1);
/// assert_eq!(config.ftq.initial_capacity, 32);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use fdip_core::config::{Config, SizingMode};
///
/// let json = r#"{
///     "general": { "num_cores": 2 },
///     "ftq": {
///         "initial_capacity": 24,
///         "sizing": { "mode": "Combined" }
///     },
///     "fusion": { "sets": 64, "ways": 2 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.general.num_cores, 2);
/// assert_eq!(config.ftq.initial_capacity, 24);
/// assert_eq!(config.ftq.sizing.mode, SizingMode::Combined);
/// assert!((config.ftq.sizing.utility_threshold - 0.70).abs() < f64::EPSILON);
/// assert_eq!(config.fusion.ways, 2);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General simulation settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Fetch-target queue settings
    #[serde(default)]
    pub ftq: FtqConfig,
    /// Fusion prediction settings
    #[serde(default)]
    pub fusion: FusionConfig,
}

impl Config {
    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks that every size and threshold is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.num_cores == 0 {
            return Err(ConfigError::Zero("general.num_cores"));
        }
        if self.general.watchdog_cycles == 0 {
            return Err(ConfigError::Zero("general.watchdog_cycles"));
        }
        self.ftq.validate()?;
        self.fusion.validate()
    }
}

/// General simulation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Number of cores, each with a private front end.
    #[serde(default = "GeneralConfig::default_num_cores")]
    pub num_cores: usize,

    /// Trace-driven mode: while off-path, redirect the Frontend on every
    /// predicted-taken control-flow op.
    #[serde(default)]
    pub trace_mode: bool,

    /// Consecutive cycles without a fetched op before the run is aborted.
    #[serde(default = "GeneralConfig::default_watchdog_cycles")]
    pub watchdog_cycles: u64,
}

impl GeneralConfig {
    fn default_num_cores() -> usize {
        defaults::NUM_CORES
    }

    fn default_watchdog_cycles() -> u64 {
        defaults::WATCHDOG_CYCLES
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            num_cores: defaults::NUM_CORES,
            trace_mode: false,
            watchdog_cycles: defaults::WATCHDOG_CYCLES,
        }
    }
}

/// Fetch-target queue configuration.
///
/// Capacities are counted in fetch targets, bandwidth limits per cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct FtqConfig {
    /// Capacity at startup
    #[serde(default = "FtqConfig::default_capacity")]
    pub initial_capacity: usize,

    /// Smallest capacity the sizing controller may select
    #[serde(default = "FtqConfig::default_min_capacity")]
    pub min_capacity: usize,

    /// Largest capacity the sizing controller may select
    #[serde(default = "FtqConfig::default_max_capacity")]
    pub max_capacity: usize,

    /// Taken control-flow ops admitted per cycle
    #[serde(default = "FtqConfig::default_taken_cfs")]
    pub taken_cfs_per_cycle: u64,

    /// Instruction bytes admitted per cycle
    #[serde(default = "FtqConfig::default_bytes")]
    pub bytes_per_cycle: u64,

    /// Instruction cache line size in bytes
    #[serde(default = "FtqConfig::default_icache_line")]
    pub icache_line_bytes: u64,

    /// Adaptive sizing controller settings
    #[serde(default)]
    pub sizing: SizingConfig,
}

impl FtqConfig {
    fn default_capacity() -> usize {
        defaults::FTQ_CAPACITY
    }

    fn default_min_capacity() -> usize {
        defaults::FTQ_MIN_CAPACITY
    }

    fn default_max_capacity() -> usize {
        defaults::FTQ_MAX_CAPACITY
    }

    fn default_taken_cfs() -> u64 {
        defaults::TAKEN_CFS_PER_CYCLE
    }

    fn default_bytes() -> u64 {
        defaults::BYTES_PER_CYCLE
    }

    fn default_icache_line() -> u64 {
        defaults::ICACHE_LINE_BYTES
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_capacity == 0 {
            return Err(ConfigError::Zero("ftq.min_capacity"));
        }
        if self.min_capacity > self.initial_capacity || self.initial_capacity > self.max_capacity
        {
            return Err(ConfigError::CapacityBounds {
                min: self.min_capacity,
                initial: self.initial_capacity,
                max: self.max_capacity,
            });
        }
        if self.taken_cfs_per_cycle == 0 {
            return Err(ConfigError::Zero("ftq.taken_cfs_per_cycle"));
        }
        if self.bytes_per_cycle == 0 {
            return Err(ConfigError::Zero("ftq.bytes_per_cycle"));
        }
        if !self.icache_line_bytes.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "ftq.icache_line_bytes",
                value: self.icache_line_bytes,
            });
        }
        self.sizing.validate()
    }
}

impl Default for FtqConfig {
    fn default() -> Self {
        Self {
            initial_capacity: defaults::FTQ_CAPACITY,
            min_capacity: defaults::FTQ_MIN_CAPACITY,
            max_capacity: defaults::FTQ_MAX_CAPACITY,
            taken_cfs_per_cycle: defaults::TAKEN_CFS_PER_CYCLE,
            bytes_per_cycle: defaults::BYTES_PER_CYCLE,
            icache_line_bytes: defaults::ICACHE_LINE_BYTES,
            sizing: SizingConfig::default(),
        }
    }
}

/// Adaptive sizing controller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Sizing policy
    #[serde(default)]
    pub mode: SizingMode,

    /// Utility ratio threshold
    #[serde(default = "SizingConfig::default_utility_threshold")]
    pub utility_threshold: f64,

    /// Timeliness ratio threshold
    #[serde(default = "SizingConfig::default_timeliness_threshold")]
    pub timeliness_threshold: f64,

    /// Coefficients of the combined-mode blend
    #[serde(default)]
    pub blend: BlendCoefficients,
}

impl SizingConfig {
    fn default_utility_threshold() -> f64 {
        defaults::UTILITY_THRESHOLD
    }

    fn default_timeliness_threshold() -> f64 {
        defaults::TIMELINESS_THRESHOLD
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("ftq.sizing.utility_threshold", self.utility_threshold),
            ("ftq.sizing.timeliness_threshold", self.timeliness_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Threshold { name, value });
            }
        }
        Ok(())
    }
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            mode: SizingMode::default(),
            utility_threshold: defaults::UTILITY_THRESHOLD,
            timeliness_threshold: defaults::TIMELINESS_THRESHOLD,
            blend: BlendCoefficients::default(),
        }
    }
}

/// Coefficients of the combined-mode capacity blend:
///
/// `new = round(u·qU + t·qT + uu·qU² + tt·qT² + ut·qU·qT)`
///
/// The defaults were fitted against reference runs and carry no closed-form
/// derivation; treat them as calibrated policy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BlendCoefficients {
    /// Linear utility term
    #[serde(default = "BlendCoefficients::default_u")]
    pub u: f64,
    /// Linear timeliness term
    #[serde(default = "BlendCoefficients::default_t")]
    pub t: f64,
    /// Quadratic utility term
    #[serde(default = "BlendCoefficients::default_uu")]
    pub uu: f64,
    /// Quadratic timeliness term
    #[serde(default = "BlendCoefficients::default_tt")]
    pub tt: f64,
    /// Cross term
    #[serde(default = "BlendCoefficients::default_ut")]
    pub ut: f64,
}

impl BlendCoefficients {
    fn default_u() -> f64 {
        defaults::BLEND_U
    }

    fn default_t() -> f64 {
        defaults::BLEND_T
    }

    fn default_uu() -> f64 {
        defaults::BLEND_UU
    }

    fn default_tt() -> f64 {
        defaults::BLEND_TT
    }

    fn default_ut() -> f64 {
        defaults::BLEND_UT
    }
}

impl Default for BlendCoefficients {
    fn default() -> Self {
        Self {
            u: defaults::BLEND_U,
            t: defaults::BLEND_T,
            uu: defaults::BLEND_UU,
            tt: defaults::BLEND_TT,
            ut: defaults::BLEND_UT,
        }
    }
}

/// Fusion prediction subsystem configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FusionConfig {
    /// Sets per predictor table (local and global)
    #[serde(default = "FusionConfig::default_sets")]
    pub sets: usize,

    /// Ways per set
    #[serde(default = "FusionConfig::default_ways")]
    pub ways: usize,

    /// Entries in the tournament selector table
    #[serde(default = "FusionConfig::default_selector_entries")]
    pub selector_entries: usize,

    /// Entries in the load unfused-committed history
    #[serde(default = "FusionConfig::default_load_history_entries")]
    pub load_history_entries: usize,

    /// Cacheline granularity of history tags, in bytes
    #[serde(default = "FusionConfig::default_cacheline_bytes")]
    pub cacheline_bytes: u64,

    /// Width of the global fusion-outcome history register
    #[serde(default = "FusionConfig::default_history_bits")]
    pub history_bits: u32,
}

impl FusionConfig {
    fn default_sets() -> usize {
        defaults::FUSION_SETS
    }

    fn default_ways() -> usize {
        defaults::FUSION_WAYS
    }

    fn default_selector_entries() -> usize {
        defaults::FUSION_SELECTOR_ENTRIES
    }

    fn default_load_history_entries() -> usize {
        defaults::LOAD_HISTORY_ENTRIES
    }

    fn default_cacheline_bytes() -> u64 {
        defaults::CACHELINE_BYTES
    }

    fn default_history_bits() -> u32 {
        defaults::FUSION_HISTORY_BITS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sets == 0 {
            return Err(ConfigError::Zero("fusion.sets"));
        }
        if self.ways == 0 {
            return Err(ConfigError::Zero("fusion.ways"));
        }
        if self.ways > MAX_FUSION_WAYS {
            return Err(ConfigError::TooManyWays {
                ways: self.ways,
                max: MAX_FUSION_WAYS,
            });
        }
        if self.selector_entries == 0 {
            return Err(ConfigError::Zero("fusion.selector_entries"));
        }
        if self.load_history_entries == 0 {
            return Err(ConfigError::Zero("fusion.load_history_entries"));
        }
        if !self.cacheline_bytes.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "fusion.cacheline_bytes",
                value: self.cacheline_bytes,
            });
        }
        Ok(())
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            sets: defaults::FUSION_SETS,
            ways: defaults::FUSION_WAYS,
            selector_entries: defaults::FUSION_SELECTOR_ENTRIES,
            load_history_entries: defaults::LOAD_HISTORY_ENTRIES,
            cacheline_bytes: defaults::CACHELINE_BYTES,
            history_bits: defaults::FUSION_HISTORY_BITS,
        }
    }
}
