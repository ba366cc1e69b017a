use super::*;
use crate::database::Metric;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.protocol, "http");
    assert_eq!(config.embedding.host, "localhost");
    assert_eq!(config.embedding.port, 11434);
    assert_eq!(config.embedding.model, "nomic-embed-text:latest");
    assert_eq!(config.embedding.batch_size, 16);
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.overlap, 200);
    assert_eq!(config.store.embedding_dimension, 768);
    assert_eq!(config.store.metric, Metric::Cosine);
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.conversation.max_sessions, 100);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.embedding.protocol = "ftp".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.embedding.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.store.embedding_dimension = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidEmbeddingDimension(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.store.embedding_dimension = 8193;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.overlap = invalid_config.chunking.chunk_size;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::OverlapTooLarge(1000, 1000))
    ));

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_size = 0;
    invalid_config.chunking.overlap = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkSize(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.embed_timeout_secs = 601;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.conversation.max_sessions = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidMaxSessions(0))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = OllamaConfig::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [chunking]
        chunk_size = 300
        unit = "words"

        [store]
        metric = "euclidean"
        "#,
    )
    .expect("should parse partial toml");

    assert_eq!(parsed.chunking.chunk_size, 300);
    assert_eq!(parsed.chunking.overlap, 200);
    assert_eq!(parsed.store.metric, Metric::Euclidean);
    assert_eq!(parsed.store.embedding_dimension, 768);
    assert_eq!(parsed.embedding, OllamaConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig {
        protocol: "http".to_string(),
        host: "localhost".to_string(),
        port: 11434,
        model: "test-model".to_string(),
        batch_size: 32,
    };

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());

    assert_eq!(config.protocol, "https");
    assert_eq!(config.host, "example.com");
    assert_eq!(config.port, 8080);
    assert_eq!(config.batch_size, 128);
}

#[test]
fn load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let config = Config::load(temp_dir.path()).expect("missing config is not an error");

    assert_eq!(config.embedding, OllamaConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(
        config.vector_store_path(),
        temp_dir.path().join("vectors.json")
    );
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_dir = temp_dir.path().join(".recall");

    let mut config = Config {
        base_dir: config_dir.clone(),
        ..Config::default()
    };
    config.embedding.model = "mxbai-embed-large".to_string();
    config.store.embedding_dimension = 1024;
    config.retrieval.top_k = 8;

    config.save().expect("should save config");
    assert!(config.config_file_path().exists());

    let loaded = Config::load(&config_dir).expect("should load config");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\ntop_k = 0\n",
    )
    .expect("should write config file");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn save_rejects_invalid_config() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.embedding.batch_size = 0;

    assert!(config.save().is_err());
    assert!(!config.config_file_path().exists());
}
