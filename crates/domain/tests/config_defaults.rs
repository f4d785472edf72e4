use na_domain::config::{Config, ConfigSeverity, StoreDriver};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8090
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn defaults_validate_cleanly() {
    let config = Config::default();
    let errors: Vec<_> = config
        .validate()
        .into_iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn session_ttl_defaults() {
    let config = Config::default();
    assert_eq!(config.session.access_ttl().as_secs(), 15 * 60);
    assert_eq!(config.session.refresh_ttl().as_secs(), 7 * 86_400);
}

#[test]
fn renew_interval_is_half_ttl() {
    let config = Config::default();
    assert_eq!(
        config.service_token.renew_interval().as_secs(),
        config.service_token.ttl_secs / 2
    );
}

#[test]
fn bad_collaborator_url_is_an_error() {
    let toml_str = r#"
[gameplay]
base_url = "not-a-url"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.field == "gameplay.base_url"));
}

#[test]
fn memory_driver_warns_but_passes() {
    let toml_str = r#"
[store]
driver = "memory"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.store.driver, StoreDriver::Memory);
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Warning && i.field == "store.driver"));
    assert!(!issues.iter().any(|i| i.severity == ConfigSeverity::Error));
}
