//! # Configuration Tests
//!
//! Tests for configuration structures, deserialization, defaults and
//! validation.

use fdip_core::common::ConfigError;
use fdip_core::config::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.general.num_cores, 1);
    assert!(!config.general.trace_mode);
    assert_eq!(config.general.watchdog_cycles, 100_000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_ftq_config_defaults() {
    let ftq = FtqConfig::default();
    assert_eq!(ftq.initial_capacity, 32);
    assert_eq!(ftq.min_capacity, 4);
    assert_eq!(ftq.max_capacity, 128);
    assert_eq!(ftq.taken_cfs_per_cycle, 2);
    assert_eq!(ftq.bytes_per_cycle, 64);
    assert_eq!(ftq.icache_line_bytes, 64);
}

#[test]
fn test_sizing_config_defaults() {
    let sizing = SizingConfig::default();
    assert_eq!(sizing.mode, SizingMode::Disabled);
    assert!((sizing.utility_threshold - 0.70).abs() < f64::EPSILON);
    assert!((sizing.timeliness_threshold - 0.77).abs() < f64::EPSILON);
    assert_eq!(sizing.blend, BlendCoefficients {
        u: -2.3,
        t: -31.2,
        uu: 0.007,
        tt: 0.1,
        ut: 0.3,
    });
}

#[test]
fn test_fusion_config_defaults() {
    let fusion = FusionConfig::default();
    assert_eq!(fusion.sets, 256);
    assert_eq!(fusion.ways, 4);
    assert_eq!(fusion.selector_entries, 2048);
    assert_eq!(fusion.load_history_entries, 6);
    assert_eq!(fusion.cacheline_bytes, 64);
    assert_eq!(fusion.history_bits, 12);
}

#[test]
fn test_empty_json_matches_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.general.num_cores, 1);
    assert_eq!(config.ftq.initial_capacity, 32);
    assert_eq!(config.fusion.sets, 256);
}

#[test]
fn test_partial_json_overrides() {
    let json = r#"{
        "general": { "trace_mode": true, "watchdog_cycles": 500 },
        "ftq": {
            "min_capacity": 2,
            "max_capacity": 16,
            "initial_capacity": 8,
            "sizing": {
                "mode": "Timeliness",
                "timeliness_threshold": 0.5,
                "blend": { "ut": 1.5 }
            }
        }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert!(config.general.trace_mode);
    assert_eq!(config.general.watchdog_cycles, 500);
    assert_eq!(config.ftq.initial_capacity, 8);
    assert_eq!(config.ftq.sizing.mode, SizingMode::Timeliness);
    assert!((config.ftq.sizing.timeliness_threshold - 0.5).abs() < f64::EPSILON);
    assert!((config.ftq.sizing.blend.ut - 1.5).abs() < f64::EPSILON);
    assert!((config.ftq.sizing.blend.u + 2.3).abs() < f64::EPSILON);
    assert!(config.validate().is_ok());
}

#[test]
fn test_all_sizing_modes_deserialize() {
    for (name, mode) in [
        ("Disabled", SizingMode::Disabled),
        ("Utility", SizingMode::Utility),
        ("Timeliness", SizingMode::Timeliness),
        ("Combined", SizingMode::Combined),
    ] {
        let json = format!(r#"{{ "ftq": {{ "sizing": {{ "mode": "{name}" }} }} }}"#);
        assert_eq!(Config::from_json(&json).unwrap().ftq.sizing.mode, mode);
    }
}

#[test]
fn test_unknown_sizing_mode_rejected() {
    let json = r#"{ "ftq": { "sizing": { "mode": "Adaptive" } } }"#;
    assert!(Config::from_json(json).is_err());
}

#[test]
fn test_validate_capacity_bounds() {
    let mut config = Config::default();
    config.ftq.initial_capacity = 2;
    assert_eq!(config.validate(), Err(ConfigError::CapacityBounds {
        min: 4,
        initial: 2,
        max: 128,
    }));

    config.ftq.initial_capacity = 200;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::CapacityBounds { initial: 200, .. })
    ));
}

#[test]
fn test_validate_zero_sizes() {
    let mut config = Config::default();
    config.general.num_cores = 0;
    assert_eq!(config.validate(), Err(ConfigError::Zero("general.num_cores")));

    let mut config = Config::default();
    config.ftq.min_capacity = 0;
    assert_eq!(config.validate(), Err(ConfigError::Zero("ftq.min_capacity")));

    let mut config = Config::default();
    config.fusion.load_history_entries = 0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::Zero("fusion.load_history_entries"))
    );
}

#[test]
fn test_validate_power_of_two() {
    let mut config = Config::default();
    config.ftq.icache_line_bytes = 48;
    assert_eq!(config.validate(), Err(ConfigError::NotPowerOfTwo {
        name: "ftq.icache_line_bytes",
        value: 48,
    }));
}

#[test]
fn test_validate_too_many_ways() {
    let mut config = Config::default();
    config.fusion.ways = 65;
    assert_eq!(config.validate(), Err(ConfigError::TooManyWays {
        ways: 65,
        max: 64,
    }));
}

#[test]
fn test_validate_threshold_range() {
    let mut config = Config::default();
    config.ftq.sizing.utility_threshold = 1.5;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Threshold {
            name: "ftq.sizing.utility_threshold",
            ..
        })
    ));

    config.ftq.sizing.utility_threshold = f64::NAN;
    assert!(config.validate().is_err());
}
