use figment::Jail;

use ragdb_core::config::{expand_path, resolve_with_base, BackendKind, Config, Settings};

#[test]
fn defaults_apply_without_any_files() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "dev");
        let settings = Config::load().map_err(|e| e.to_string())?.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.elasticsearch.url(), "http://localhost:9200");
        assert_eq!(settings.elasticsearch.index, "vector_rag_documents");
        assert_eq!(settings.embedding.dimension, 384);
        assert_eq!(settings.search.default_max_context, 3);
        assert_eq!(settings.backend.kind, BackendKind::Elastic);
        Ok(())
    });
}

#[test]
fn env_file_and_variables_layer_in_order() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file(
            "config.toml",
            r#"
            [elasticsearch]
            host = "es.internal"
            port = 9201

            [search]
            text_weight = 0.4
            "#,
        )?;
        jail.create_file(
            "config.test.toml",
            r#"
            [backend]
            kind = "local"

            [embedding]
            fake = true
            dimension = 64
            "#,
        )?;
        jail.set_env("APP_SEARCH__TEXT_WEIGHT", "0.5");
        jail.set_env("APP_ELASTICSEARCH__SCHEME", "https");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.elasticsearch.url(), "https://es.internal:9201");
        assert!((settings.search.text_weight - 0.5).abs() < 1e-6, "env overrides files");
        assert!((settings.search.vector_weight - 0.7).abs() < 1e-6);
        assert_eq!(settings.backend.kind, BackendKind::Local);
        assert!(settings.embedding.fake);
        assert_eq!(settings.embedding.dimension, 64);

        let host: String = config.get("elasticsearch.host").map_err(|e| e.to_string())?;
        assert_eq!(host, "es.internal");
        Ok(())
    });
}

#[test]
fn invalid_settings_are_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "dev");
        jail.create_file("config.toml", "[embedding]\ndimension = 0\n")?;
        let err = Config::load().map_err(|e| e.to_string())?.settings().unwrap_err();
        assert_eq!(err.status_code(), 500);
        Ok(())
    });
}

#[test]
fn production_refuses_fake_embeddings() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "production");
        jail.create_file("config.prod.toml", "[embedding]\nfake = true\n")?;
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn paths_expand_env_and_resolve_against_base() {
    Jail::expect_with(|jail| {
        jail.set_env("RAGDB_MODELS", "/opt/models");
        assert_eq!(expand_path("${RAGDB_MODELS}/minilm"), std::path::PathBuf::from("/opt/models/minilm"));
        let base = std::path::Path::new("/srv/ragdb");
        assert_eq!(resolve_with_base(base, "data"), base.join("data"));
        assert_eq!(resolve_with_base(base, "/abs/data"), std::path::PathBuf::from("/abs/data"));
        Ok(())
    });
}
