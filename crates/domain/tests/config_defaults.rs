use voice_domain::config::Config;

#[test]
fn default_host_binds_all_interfaces() {
    let config = Config::default();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_retrieval_tuning_matches_contract() {
    let config = Config::default();
    assert_eq!(config.retrieval.rrf_k, 60);
    assert_eq!(config.retrieval.limit, 3);
    assert!((config.retrieval.similarity_floor - 0.7).abs() < f32::EPSILON);
}

#[test]
fn default_stt_reconnect_schedule_matches_contract() {
    let config = Config::default();
    assert_eq!(config.stt.reconnect_base_delay_ms, 1000);
    assert_eq!(config.stt.max_reconnect_attempts, 3);
    assert_eq!(config.stt.endpointing_ms, 300);
    assert_eq!(config.stt.utterance_end_ms, 1000);
}

#[test]
fn default_billing_ticker_matches_contract() {
    let config = Config::default();
    assert_eq!(config.billing.ticker_interval_secs, 30);
    assert_eq!(config.billing.ghost_watchdog_interval_secs, 5);
    assert_eq!(config.billing.ghost_silence_threshold_secs, 10);
}

#[test]
fn explicit_port_parses_from_toml() {
    let toml_str = r#"
[server]
host = "127.0.0.1"
port = 8080
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
}
