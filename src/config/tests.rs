use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_select_memory_backend_and_api_path() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.provider.backend, ProviderBackend::Memory);
    assert!(!settings.provider.seed);
    assert_eq!(settings.api.base_path, "/api/blog");
    assert_eq!(settings.queries.tag_page_size, 50);
    assert_eq!(settings.queries.capacity.get(), DEFAULT_QUERY_CACHE_CAPACITY);
    assert!(settings.database.migrate_on_start);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn postgres_backend_requires_database_url() {
    let mut raw = RawSettings::default();
    raw.provider.backend = Some("postgres".to_string());

    let err = Settings::from_raw(raw.clone()).expect_err("missing url");
    assert!(matches!(err, LoadError::Invalid { key: "database.url", .. }));

    raw.database.url = Some("  postgres://localhost/quire ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.provider.backend, ProviderBackend::Postgres);
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://localhost/quire")
    );
}

#[test]
fn rejects_invalid_values() {
    let cases: [(fn(&mut RawSettings), &str); 5] = [
        (|raw| raw.server.port = Some(0), "server.port"),
        (|raw| raw.queries.cache_capacity = Some(0), "queries.cache_capacity"),
        (|raw| raw.queries.tag_page_size = Some(0), "queries.tag_page_size"),
        (|raw| raw.api.base_path = Some("blog".into()), "api.base_path"),
        (|raw| raw.provider.backend = Some("sqlite".into()), "provider.backend"),
    ];

    for (mutate, expected) in cases {
        let mut raw = RawSettings::default();
        mutate(&mut raw);
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, expected),
            other => panic!("expected invalid `{expected}`, got {other:?}"),
        }
    }
}

#[test]
fn base_path_trailing_slash_is_trimmed() {
    let mut raw = RawSettings::default();
    raw.api.base_path = Some("/blog/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.api.base_path, "/blog");

    let mut raw = RawSettings::default();
    raw.api.base_path = Some("/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.api.base_path, "/");
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["quire"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "quire",
        "serve",
        "--provider-backend",
        "memory",
        "--provider-seed",
        "true",
        "--queries-tag-page-size",
        "10",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.provider_backend, Some(BackendArg::Memory));
            assert_eq!(serve.overrides.provider_seed, Some(true));
            assert_eq!(serve.overrides.queries_tag_page_size, Some(10));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrations_revert_arguments() {
    let args = CliArgs::parse_from([
        "quire",
        "migrations",
        "revert",
        "--database-url",
        "postgres://example",
        "--target",
        "20250101000100",
    ]);

    match args.command.expect("migrations command") {
        Command::Migrations(migrations) => match migrations.command {
            MigrationsCommand::Revert(revert) => {
                assert_eq!(
                    revert.database.database_url.as_deref(),
                    Some("postgres://example")
                );
                assert_eq!(revert.target, Some(20_250_101_000_100));
            }
            other => panic!("wrong migrations command parsed: {other:?}"),
        },
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn migrations_force_postgres_backend() {
    let args = CliArgs::parse_from(["quire", "migrations", "status"]);
    let mut raw = RawSettings::default();
    if let Some(Command::Migrations(migrations)) = args.command.as_ref() {
        raw.apply_database_override(migrations.command.database());
    }
    raw.provider.backend = Some(BackendArg::Postgres.as_str().to_string());

    assert!(Settings::from_raw(raw).is_err());
}
