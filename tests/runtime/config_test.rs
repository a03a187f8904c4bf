/*!
 * Configuration Tests
 * Environment, JSON files and validation
 */

use lwp_kernel::core::limits::{DEFAULT_MAX_HEAP_BYTES, DEFAULT_REDUCTIONS};
use lwp_kernel::{KernelError, Runtime, RuntimeBuilder, RuntimeConfig};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const VARS: &[&str] = &[
    "LWP_WORKERS",
    "LWP_REDUCTIONS",
    "LWP_MAX_PROCESSES",
    "LWP_MAX_HEAP_BYTES",
    "LWP_MAILBOX_CAPACITY",
    "LWP_GC_MIN_THRESHOLD",
    "LWP_TOMBSTONE_RETENTION",
    "LWP_IDLE_PARK_MS",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_env_overrides_defaults() {
    clear_env();
    std::env::set_var("LWP_WORKERS", "0");
    std::env::set_var("LWP_REDUCTIONS", "500");
    std::env::set_var("LWP_MAILBOX_CAPACITY", "128");
    std::env::set_var("LWP_IDLE_PARK_MS", "2");

    let config = RuntimeConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.workers, 0);
    assert_eq!(config.reductions_per_quantum, 500);
    assert_eq!(config.mailbox_capacity, Some(128));
    assert_eq!(config.idle_park(), Duration::from_millis(2));
    assert_eq!(config.max_heap_bytes, DEFAULT_MAX_HEAP_BYTES);
}

#[test]
#[serial]
fn test_env_zero_mailbox_capacity_means_unbounded() {
    clear_env();
    std::env::set_var("LWP_MAILBOX_CAPACITY", "0");

    let config = RuntimeConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.mailbox_capacity, None);
}

#[test]
#[serial]
fn test_env_rejects_garbage() {
    clear_env();
    std::env::set_var("LWP_WORKERS", "many");

    let result = RuntimeConfig::from_env();
    clear_env();

    match result {
        Err(KernelError::Configuration(msg)) => assert!(msg.contains("LWP_WORKERS")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_runtime_from_env_manual_mode() {
    clear_env();
    std::env::set_var("LWP_WORKERS", "0");

    let runtime = Runtime::from_env().unwrap();
    clear_env();

    assert_eq!(runtime.worker_count(), 0);
    assert_eq!(runtime.config().workers, 0);
}

#[test]
fn test_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"workers": 0, "reductions_per_quantum": 100, "mailbox_capacity": 64}}"#
    )
    .unwrap();

    let config = RuntimeConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.workers, 0);
    assert_eq!(config.reductions_per_quantum, 100);
    assert_eq!(config.mailbox_capacity, Some(64));

    let runtime = RuntimeBuilder::from_config(config).build().unwrap();
    assert_eq!(runtime.config().reductions_per_quantum, 100);
}

#[test]
fn test_from_json_file_errors() {
    let missing = RuntimeConfig::from_json_file("/nonexistent/lwp.json");
    assert!(matches!(missing, Err(KernelError::Io(_))));

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let invalid = RuntimeConfig::from_json_file(file.path());
    assert!(matches!(invalid, Err(KernelError::Configuration(_))));

    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"reductions_per_quantum": 0}}"#).unwrap();
    let out_of_range = RuntimeConfig::from_json_file(file.path());
    assert!(matches!(out_of_range, Err(KernelError::Configuration(_))));
}

#[test]
fn test_config_roundtrips_through_json() {
    let config = RuntimeConfig {
        mailbox_capacity: Some(32),
        ..RuntimeConfig::manual()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(RuntimeConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        RuntimeConfig {
            reductions_per_quantum: 0,
            ..RuntimeConfig::manual()
        },
        RuntimeConfig {
            max_heap_bytes: 0,
            ..RuntimeConfig::manual()
        },
        RuntimeConfig {
            gc_min_threshold: 0,
            ..RuntimeConfig::manual()
        },
        RuntimeConfig {
            max_heap_bytes: 64 * 1024,
            gc_min_threshold: 64 * 1024,
            ..RuntimeConfig::manual()
        },
        RuntimeConfig {
            idle_park_ms: 0,
            ..RuntimeConfig::manual()
        },
        RuntimeConfig {
            workers: 100_000,
            ..RuntimeConfig::manual()
        },
    ];

    for config in cases {
        assert!(
            matches!(Runtime::new(config.clone()), Err(KernelError::Configuration(_))),
            "accepted {config:?}"
        );
    }
    assert_eq!(RuntimeConfig::manual().reductions_per_quantum, DEFAULT_REDUCTIONS);
}
