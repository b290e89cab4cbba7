use crate::Config;
use crate::tests::{EnvGuard, setup_config_dir, write_config};

use googletest::assert_that;
use googletest::prelude::{anything, contains_substring, eq, err};
use serial_test::serial;

// =========================================================================
// Edge Cases
// =========================================================================

#[test]
#[serial]
fn given_malformed_toml_when_load_then_error_mentions_file() {
    // Given
    let (temp, _guard) = setup_config_dir();
    write_config(&temp, "this is not valid toml {{{{");

    // When
    let result = Config::load();

    // Then
    assert_that!(result, err(anything()));
    let err_msg = format!("{}", result.unwrap_err());
    assert_that!(err_msg, contains_substring("config.toml"));
}

#[test]
#[serial]
fn given_unparseable_env_number_when_load_then_keeps_previous_value() {
    // Given
    let _temp = setup_config_dir();
    let _port = EnvGuard::set("RQ_WORKER_PORT", "not-a-port");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.worker.port, eq(crate::DEFAULT_PORT));
}

#[test]
#[serial]
fn given_log_dir_with_traversal_when_validate_then_error() {
    // Given
    let (temp, _guard) = setup_config_dir();
    write_config(&temp, "[logging]\ndir = \"../outside\"");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
    let err_msg = format!("{}", result.unwrap_err());
    assert_that!(err_msg, contains_substring(".."));
}

#[test]
#[serial]
fn given_unknown_section_when_load_then_ignored() {
    // Given
    let (temp, _guard) = setup_config_dir();
    write_config(&temp, "[metrics]\nenabled = true\n\n[worker]\nport = 4100");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.worker.port, eq(4100));
}
