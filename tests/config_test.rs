//! Integration tests for layer configuration

use burn::backend::NdArray;
use burn::config::Config;
use episodic_lstm::prelude::*;

type Backend = NdArray<f32>;

#[test]
fn test_config_json_roundtrip() {
    let config = LstmConfig::new(vec![4, 4], 32, MergeMode::Outer);

    let json = config.to_string();
    assert!(json.contains("\"merge_mode\":\"outer\"") || json.contains("\"merge_mode\": \"outer\""));

    let loaded = LstmConfig::load_binary(json.as_bytes()).unwrap();
    assert_eq!(loaded.input_shape, vec![4, 4]);
    assert_eq!(loaded.num_units, 32);
    assert_eq!(loaded.merge_mode, MergeMode::Outer);
    assert_eq!(loaded.input_size(), 16);
}

#[test]
fn test_unknown_merge_mode_is_rejected() {
    let json = r#"{"input_shape":[4],"num_units":8,"merge_mode":"middle"}"#;
    assert!(LstmConfig::load_binary(json.as_bytes()).is_err());

    let err = "middle".parse::<MergeMode>().unwrap_err();
    assert!(matches!(err, StateError::InvalidConfiguration(_)));
}

#[test]
fn test_init_from_config() {
    let device = Default::default();
    let lstm = LstmConfig::new(vec![12], 64, MergeMode::Inner)
        .init::<Backend>(&device)
        .unwrap();

    assert_eq!(lstm.input_size(), 12);
    assert_eq!(lstm.num_units(), 64);
    assert_eq!(lstm.merge_mode(), MergeMode::Inner);
    assert_eq!(lstm.cell().input_size(), 12);
    assert_eq!(lstm.cell().hidden_size(), 64);
    assert!(lstm.last_state().is_none());
}

#[test]
fn test_cell_must_match_config() {
    let device = Default::default();
    let cell = LSTMCell::<Backend>::new(12, 32, &device);

    let err = LstmConfig::new(vec![12], 64, MergeMode::Inner)
        .init_with_cell(cell, &device)
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidConfiguration(_)));
}
