//! Configuration loading from JSON files.

use std::io::Write;

use sas_egm::config::{InterByteDelayMode, SasClientConfig, SasGroups};
use sas_egm::SasError;
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"{
            "client_id": 1,
            "address": 12,
            "groups": "GENERAL_CONTROL | EFT",
            "inter_byte_delay_mode": "LogOnly",
            "disable_play_on_link_down": false
        }"#,
    );
    let config = SasClientConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.client_id, 1);
    assert_eq!(config.address, 12);
    assert_eq!(config.groups, SasGroups::GENERAL_CONTROL | SasGroups::EFT);
    assert_eq!(config.inter_byte_delay_mode, InterByteDelayMode::LogOnly);
    assert!(!config.disable_play_on_link_down);
    assert_eq!(config.chirp_interval_ms, 200);
}

#[test]
fn test_round_trip_through_file() {
    let config = SasClientConfig {
        address: 99,
        real_time_reporting: true,
        ..Default::default()
    };
    let file = write_config(&serde_json::to_string(&config).unwrap());
    assert_eq!(SasClientConfig::from_json_file(file.path()).unwrap(), config);
}

#[test]
fn test_invalid_address_rejected() {
    let file = write_config(r#"{"address": 200}"#);
    assert!(matches!(
        SasClientConfig::from_json_file(file.path()),
        Err(SasError::InvalidConfig(_))
    ));
}

#[test]
fn test_unknown_accounting_denomination_rejected() {
    for code in [0x00, 0x20, 0xEE] {
        let file = write_config(&format!(r#"{{"accounting_denom": {code}}}"#));
        assert!(matches!(
            SasClientConfig::from_json_file(file.path()),
            Err(SasError::InvalidConfig(_))
        ));
    }

    let file = write_config(r#"{"accounting_denom": 4}"#);
    let config = SasClientConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.accounting_denomination().unwrap().cents(), Some(25));
}

#[test]
fn test_empty_groups_rejected() {
    let file = write_config(r#"{"groups": ""}"#);
    assert!(matches!(
        SasClientConfig::from_json_file(file.path()),
        Err(SasError::InvalidConfig(_))
    ));
}

#[test]
fn test_bad_json_and_missing_file() {
    let file = write_config("{ not json");
    assert!(matches!(
        SasClientConfig::from_json_file(file.path()),
        Err(SasError::Json(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        SasClientConfig::from_json_file(dir.path().join("missing.json")),
        Err(SasError::Io(_))
    ));
}
