use std::{env, fs};

use octofhir_ingest::config::loader::load_config;

#[test]
fn config_file_env_overrides_and_legacy_variables() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("octofhir-ingest.toml");

    let toml_content = r#"
data_dir = "/srv/fhir"
fhir_server_url = "http://fhir.local:8080/fhir"
ping_server = true

[server]
host = "127.0.0.1"
port = 9000

[retry]
poll_interval_ms = 2000
max_wait_secs = 600

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) File values over defaults
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.data_dir.to_str(), Some("/srv/fhir"));
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.retry.poll_interval_ms, 2000);
    assert_eq!(cfg.retry.probe_interval_ms, 5000);
    assert_eq!(cfg.retry.batch_delay_ms, 1000);
    assert_eq!(cfg.url_base, "http://host.docker.internal");
    assert_eq!(cfg.manifest_base_url(), "http://host.docker.internal:9000");

    // 2) Prefixed env overrides the file
    unsafe {
        env::set_var("OCTOFHIR_INGEST__RETRY__BATCH_DELAY_MS", "250");
        env::set_var("OCTOFHIR_INGEST__SERVER__PORT", "9100");
    }
    let cfg = load_config(path.to_str()).expect("env overrides");
    assert_eq!(cfg.retry.batch_delay_ms, 250);
    assert_eq!(cfg.server.port, 9100);

    // 3) Legacy flat variables win over everything
    unsafe {
        env::set_var("PORT", "9200");
        env::set_var("DATA_DIR", "/data/ndjson");
        env::set_var("URL_BASE", "http://10.0.0.5");
        env::set_var("BLOCKING_PING_FHIR_SERVER", "FALSE");
    }
    let cfg = load_config(path.to_str()).expect("legacy overrides");
    assert_eq!(cfg.server.port, 9200);
    assert_eq!(cfg.data_dir.to_str(), Some("/data/ndjson"));
    assert!(!cfg.ping_server);
    assert_eq!(cfg.manifest_base_url(), "http://10.0.0.5:9200");

    unsafe {
        env::set_var("BLOCKING_PING_FHIR_SERVER", "True");
    }
    assert!(load_config(path.to_str()).unwrap().ping_server);

    // 4) Bad values are rejected
    unsafe {
        env::set_var("PORT", "eighty");
    }
    let err = load_config(path.to_str()).unwrap_err();
    assert!(err.contains("PORT"), "unexpected error: {err}");

    unsafe {
        env::remove_var("PORT");
        env::set_var("OCTOFHIR_INGEST__LOGGING__LEVEL", "chatty");
    }
    assert!(load_config(path.to_str()).is_err());

    // cleanup env vars
    unsafe {
        for var in [
            "OCTOFHIR_INGEST__RETRY__BATCH_DELAY_MS",
            "OCTOFHIR_INGEST__SERVER__PORT",
            "OCTOFHIR_INGEST__LOGGING__LEVEL",
            "DATA_DIR",
            "URL_BASE",
            "BLOCKING_PING_FHIR_SERVER",
        ] {
            env::remove_var(var);
        }
    }

    // 5) Explicit path that does not exist
    let missing = dir.path().join("missing.toml");
    assert!(load_config(missing.to_str()).is_err());
}
