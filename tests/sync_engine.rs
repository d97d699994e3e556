use std::fs;

use mcpx::app_config::{add_server_to_config, remove_server_from_config};
use mcpx::backup::list_backups;
use mcpx::services::sync::{first_run_init, remove_from_platforms, sync_all, sync_project};
use mcpx::{Config, ExitStatus, McpServer, PlatformAdapter, SyncService, CONFIG_VERSION};
use serde_json::json;
use serial_test::serial;

mod support;

use support::{http, read_json, server_map, stdio, temp_home, write_json, MemoryAdapter};

fn config_of(servers: impl IntoIterator<Item = McpServer>) -> Config {
    Config {
        version: CONFIG_VERSION.to_string(),
        servers: server_map(servers),
    }
}

#[test]
fn validation_error_blocks_every_platform() {
    let (home, _paths) = temp_home();
    let adapter = MemoryAdapter::new("Memory", Some(home.path().join("memory.json")));
    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter.clone())];

    let config = config_of([
        stdio("good"),
        McpServer::stdio("bad", "mcpx-surely-missing-command-7f3a"),
    ]);
    let report = sync_all(&config, &adapters, &home.path().join("backups"));

    assert!(report.validation_failed);
    assert_eq!(report.exit_status(), ExitStatus::ConfigError);
    assert_eq!(report.platforms_synced, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0],
        "Server 'bad': Command not found: mcpx-surely-missing-command-7f3a"
    );
    assert_eq!(adapter.save_count(), 0, "no adapter may be written");
}

#[test]
fn orphans_survive_and_canonical_wins() {
    let (home, _paths) = temp_home();
    let existing = server_map([
        McpServer::http("shared", "https://old.example.com/mcp"),
        http("handmade"),
    ]);
    let adapter = MemoryAdapter::new("Memory", Some(home.path().join("memory.json")))
        .with_servers(existing);
    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter.clone())];

    let config = config_of([http("shared"), stdio("local")]);
    let report = sync_all(&config, &adapters, &home.path().join("backups"));

    assert!(report.is_clean(), "errors: {:?}", report.errors);
    assert_eq!(report.platforms_synced, 1);
    assert_eq!(report.servers_synced["Memory"], 3);

    let after = adapter.snapshot();
    assert_eq!(after["shared"], config.servers["shared"]);
    assert_eq!(after["handmade"], http("handmade"));
    let order: Vec<_> = after.keys().cloned().collect();
    assert_eq!(order, vec!["shared", "local", "handmade"]);
}

#[test]
fn one_failing_platform_does_not_stop_the_rest() {
    let (home, _paths) = temp_home();
    let missing = MemoryAdapter::new("Missing", None);
    let broken = MemoryAdapter::new("Broken", Some(home.path().join("broken.json"))).failing();
    let healthy = MemoryAdapter::new("Healthy", Some(home.path().join("healthy.json")));
    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![
        Box::new(missing),
        Box::new(broken),
        Box::new(healthy.clone()),
    ];

    let report = sync_all(&config_of([http("a")]), &adapters, &home.path().join("backups"));

    assert_eq!(report.platforms_total, 3);
    assert_eq!(report.platforms_synced, 1);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(
        report.errors,
        vec![
            "Missing: config path not found (platform not installed?)".to_string(),
            "Broken: invalid input: disk full".to_string(),
        ]
    );
    let counts: Vec<_> = report.servers_synced.values().copied().collect();
    assert_eq!(counts, vec![0, 0, 1]);
    assert_eq!(healthy.snapshot().len(), 1);
}

#[test]
#[serial]
fn unset_variable_is_a_warning_only() {
    std::env::remove_var("MCPX_TEST_SURELY_UNSET");
    let (home, _paths) = temp_home();
    let adapter = MemoryAdapter::new("Memory", Some(home.path().join("memory.json")));
    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter.clone())];

    let config = config_of([stdio("api").with_env([("TOKEN", "${MCPX_TEST_SURELY_UNSET}")])]);
    let report = sync_all(&config, &adapters, &home.path().join("backups"));

    assert!(report.is_clean());
    assert_eq!(report.platforms_synced, 1);
    assert_eq!(
        report.warnings,
        vec![
            "Server 'api': Environment variable '${MCPX_TEST_SURELY_UNSET}' not set (referenced in env.TOKEN)"
                .to_string()
        ]
    );
}

#[test]
fn sync_real_platform_files() {
    let (_home, paths) = temp_home();
    let claude_file = paths.home.join(".claude.json");
    write_json(
        &claude_file,
        &json!({
            "projects": {"/work/app": {"allowedTools": []}},
            "mcpServers": {"handmade": {"type": "stdio", "command": "node", "args": ["x.js"]}}
        }),
    );
    fs::create_dir_all(&paths.codex_home).expect("codex home");
    fs::write(paths.codex_home.join("config.toml"), "# my settings\nmodel = \"o3\"\n")
        .expect("seed codex");

    let service = SyncService::new(paths.clone());
    let config = config_of([stdio("files"), http("remote")]);
    let report = service.sync_all(&config);

    // Gemini and the three VS Code extensions are not installed.
    assert_eq!(report.platforms_total, 6);
    assert_eq!(report.platforms_synced, 2);
    assert_eq!(report.errors.len(), 4);
    assert!(report
        .errors
        .iter()
        .any(|e| e == "Gemini CLI: config path not found (platform not installed?)"));
    assert_eq!(report.servers_synced["Claude Code"], 3);
    assert_eq!(report.servers_synced["Codex CLI"], 1);
    assert!(report
        .warnings
        .contains(&"Codex CLI: server 'remote' skipped (transport not supported)".to_string()));

    let claude = read_json(&claude_file);
    assert_eq!(claude["projects"]["/work/app"]["allowedTools"], json!([]));
    assert_eq!(claude["mcpServers"]["handmade"]["command"], "node");
    assert_eq!(claude["mcpServers"]["remote"]["type"], "http");
    assert_eq!(claude["mcpServers"]["files"]["type"], "stdio");

    let codex = fs::read_to_string(paths.codex_home.join("config.toml")).expect("read codex");
    assert!(codex.contains("# my settings"), "{codex}");
    assert!(codex.contains("model = \"o3\""), "{codex}");
    assert!(codex.contains("[mcp_servers.files]"), "{codex}");
    assert!(!codex.contains("remote"), "{codex}");

    let backups = list_backups(&paths.backup_dir());
    let prefixes: Vec<_> = backups.iter().map(|b| b.prefix.as_str()).collect();
    assert!(prefixes.contains(&"claude"), "{prefixes:?}");
    assert!(prefixes.contains(&"codex"), "{prefixes:?}");
}

#[test]
fn unrecognised_entries_survive_sync() {
    let (_home, paths) = temp_home();
    let claude_file = paths.home.join(".claude.json");
    write_json(
        &claude_file,
        &json!({"mcpServers": {"legacy-sse": {"type": "sse", "url": "https://x/sse"}}}),
    );
    let gemini_file = paths.home.join(".gemini").join("settings.json");
    write_json(
        &gemini_file,
        &json!({"mcpServers": {"sse": {"url": "https://x/sse"}}}),
    );
    let codex_file = paths.codex_home.join("config.toml");
    fs::create_dir_all(&paths.codex_home).expect("codex home");
    fs::write(&codex_file, "[mcp_servers.remote]\nurl = \"https://x/mcp\"\n").expect("seed codex");

    let service = SyncService::new(paths.clone());
    let report = service.sync_all(&config_of([stdio("managed")]));
    assert_eq!(report.platforms_synced, 3, "errors: {:?}", report.errors);

    let claude = read_json(&claude_file);
    assert_eq!(
        claude["mcpServers"]["legacy-sse"],
        json!({"type": "sse", "url": "https://x/sse"})
    );
    assert!(claude["mcpServers"].get("managed").is_some());

    let gemini = read_json(&gemini_file);
    assert_eq!(gemini["mcpServers"]["sse"], json!({"url": "https://x/sse"}));
    assert!(gemini["mcpServers"].get("managed").is_some());

    let codex: toml::Table =
        toml::from_str(&fs::read_to_string(&codex_file).expect("read codex")).expect("toml");
    assert_eq!(codex["mcp_servers"]["remote"]["url"].as_str(), Some("https://x/mcp"));
    assert!(codex["mcp_servers"].get("managed").is_some());
}

#[test]
fn first_run_collects_existing_servers() {
    let (_home, paths) = temp_home();
    write_json(
        &paths.home.join(".claude.json"),
        &json!({"mcpServers": {"shared": {"command": "claude-version"}}}),
    );
    write_json(
        &paths.home.join(".gemini").join("settings.json"),
        &json!({"mcpServers": {
            "shared": {"command": "gemini-version"},
            "docs": {"httpUrl": "https://docs.example.com/mcp"}
        }}),
    );

    let service = SyncService::new(paths.clone());
    let report = service.first_run_init().expect("first run");

    assert_eq!(report.server_count, 2);
    assert_eq!(report.platforms_scanned["Claude Code"], 1);
    assert_eq!(report.platforms_scanned["Gemini CLI"], 2);
    assert_eq!(report.config_path, paths.config_file());

    let config = service.load_config().expect("load written config");
    assert_eq!(config.version, "1.0");
    assert_eq!(config.servers["shared"], McpServer::stdio("shared", "gemini-version"));
    assert_eq!(
        config.servers["docs"],
        McpServer::http("docs", "https://docs.example.com/mcp")
    );

    let err = first_run_init(&paths, service.adapters()).expect_err("config exists");
    assert!(err.to_string().contains("Config already exists"), "{err}");
}

#[test]
fn project_sync_writes_supported_platforms_only() {
    let (home, paths) = temp_home();
    let project = home.path().join("project");
    fs::create_dir_all(&project).expect("project dir");

    let adapters = mcpx::all_platforms(&paths);
    let servers = server_map([stdio("local")]);
    let report = sync_project(&servers, &project, &adapters);

    let synced: Vec<_> = report.synced.keys().cloned().collect();
    assert_eq!(synced, vec!["Claude Code", "Roo Code", "Kilo Code"]);
    assert_eq!(report.skipped, vec!["Gemini CLI", "Codex CLI", "Cline"]);
    assert!(report.errors.is_empty());

    assert!(project.join(".mcp.json").exists());
    let roo = read_json(&project.join(".roo").join("mcp.json"));
    assert_eq!(roo["mcpServers"]["local"]["disabled"], false);
    assert!(project.join(".kilocode").join("mcp.json").exists());
}

#[test]
fn removal_reaches_platform_files() {
    let (_home, paths) = temp_home();
    let claude_file = paths.home.join(".claude.json");
    write_json(
        &claude_file,
        &json!({"mcpServers": {
            "keep": {"type": "stdio", "command": "node"},
            "gone": {"type": "http", "url": "https://gone.example.com"}
        }}),
    );

    let adapters = mcpx::all_platforms(&paths);
    let report = remove_from_platforms("gone", &adapters, &paths.backup_dir());

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.platforms_synced, 1);
    assert_eq!(report.servers_synced["Claude Code"], 1);
    let claude = read_json(&claude_file);
    assert!(claude["mcpServers"].get("gone").is_none());
    assert_eq!(claude["mcpServers"]["keep"]["command"], "node");
    assert_eq!(list_backups(&paths.backup_dir()).len(), 1);

    let again = remove_from_platforms("gone", &adapters, &paths.backup_dir());
    assert_eq!(again.platforms_synced, 0);
}

#[test]
#[serial]
fn config_edits_keep_placeholders() {
    std::env::set_var("MCPX_TEST_API_TOKEN", "s3cret");
    let (_home, paths) = temp_home();
    let path = paths.config_file();

    let api = McpServer::http("api", "https://api.example.com/mcp")
        .with_headers([("Authorization", "Bearer ${MCPX_TEST_API_TOKEN}")]);
    assert!(!add_server_to_config(&path, api, false).expect("add api"));
    assert!(!add_server_to_config(&path, stdio("files"), false).expect("add files"));

    let dup = add_server_to_config(&path, stdio("files"), false).expect_err("duplicate");
    assert!(matches!(dup, mcpx::AppError::ServerExists(ref n) if n == "files"));

    assert!(remove_server_from_config(&path, "files").expect("remove"));
    assert!(!remove_server_from_config(&path, "files").expect("remove again"));

    let text = fs::read_to_string(&path).expect("read config");
    assert!(text.contains("${MCPX_TEST_API_TOKEN}"), "{text}");
    assert!(!text.contains("s3cret"), "{text}");

    let loaded = Config::load(&path).expect("load");
    match &loaded.servers["api"] {
        McpServer::Http(h) => assert_eq!(h.headers["Authorization"], "Bearer s3cret"),
        other => panic!("unexpected server: {other:?}"),
    }
    std::env::remove_var("MCPX_TEST_API_TOKEN");
}
