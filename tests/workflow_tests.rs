use anyhow::Result;
use devarch::cli::stack::{self, FilterArgs, StartArgs, StopArgs};
use devarch::infra::config::{Settings, load_app_config_from};
use devarch::test_support::MockEngine;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const REGISTRY: &str = r#"
categories:
  - name: database
    services: [postgres.yml, redis.yml]
  - name: proxy
    services: [nginx.yml]
  - name: backend
    services: [php.yml]
"#;

fn write_stack(root: &Path) -> Result<Settings> {
    let config_dir = root.join("config");
    let compose_dir = root.join("compose");
    fs::create_dir_all(&config_dir)?;

    for (category, file) in [
        ("database", "postgres.yml"),
        ("database", "redis.yml"),
        ("proxy", "nginx.yml"),
        ("backend", "php.yml"),
    ] {
        fs::create_dir_all(compose_dir.join(category))?;
        fs::write(compose_dir.join(category).join(file), "services: {}\n")?;
    }

    fs::write(config_dir.join("registry.yml"), REGISTRY)?;
    fs::write(
        config_dir.join("devarch.toml"),
        format!(
            "[engine]\nruntime = \"podman\"\n\n[paths]\ncompose_dir = {:?}\n\n[health]\ntimeout = 1\n",
            compose_dir
        ),
    )?;

    let local = root.join("nowhere");
    fs::create_dir_all(&local)?;
    load_app_config_from(&config_dir, &local)?.into_settings()
}

fn compose_runs(mock: &MockEngine) -> Vec<String> {
    mock.get_runs()
        .into_iter()
        .filter(|c| c.contains("compose"))
        .collect()
}

#[test]
fn test_workflow_start_and_stop() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let settings = write_stack(temp_dir.path())?;

    let mock = Arc::new(MockEngine::new());
    mock.set_available(&["podman"]);
    let orchestrator = stack::build_orchestrator(&settings, mock.clone(), false)?;

    println!("--- Simulating devarch start ---");
    let report = stack::start(
        &orchestrator,
        &StartArgs {
            no_wait: true,
            ..Default::default()
        },
    )?;
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.exit_code(), 0);

    let ups = compose_runs(&mock);
    let order: Vec<_> = ["postgres", "redis", "nginx", "php"]
        .iter()
        .map(|svc| ups.iter().position(|c| c.contains(&format!("/{svc}.yml up"))).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "start order {ups:?}");

    println!("--- Simulating devarch stop ---");
    let before = mock.get_runs().len();
    let report = stack::stop(&orchestrator, &StopArgs {
        timeout: 10,
        ..Default::default()
    })?;
    assert_eq!(report.succeeded, 4);

    let downs: Vec<_> = mock.get_runs().into_iter().skip(before).collect();
    let expected = ["php", "nginx", "postgres", "redis"];
    for (cmd, svc) in downs.iter().zip(expected) {
        assert!(cmd.contains(&format!("/{svc}.yml down -t 10")), "{cmd}");
    }

    Ok(())
}

#[test]
fn test_workflow_filters_and_skip() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let settings = write_stack(temp_dir.path())?;

    let mock = Arc::new(MockEngine::new());
    mock.set_available(&["podman"]);
    let orchestrator = stack::build_orchestrator(&settings, mock.clone(), false)?;

    let args = StartArgs {
        filters: FilterArgs {
            exclude: Some("proxy".into()),
            services: Some("postgres,php".into()),
            ..Default::default()
        },
        no_wait: true,
        ..Default::default()
    };
    let report = stack::start(&orchestrator, &args)?;

    assert_eq!(report.succeeded, 2);
    let runs = compose_runs(&mock);
    assert!(runs.iter().any(|c| c.contains("postgres.yml up")));
    assert!(runs.iter().any(|c| c.contains("php.yml up")));
    assert!(!runs.iter().any(|c| c.contains("redis.yml") || c.contains("nginx.yml")));

    Ok(())
}

#[test]
fn test_workflow_dry_run_prints_only() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let settings = write_stack(temp_dir.path())?;

    let mock = Arc::new(MockEngine::new());
    mock.set_available(&["podman"]);
    let orchestrator = stack::build_orchestrator(&settings, mock.clone(), true)?;

    let report = stack::stop(&orchestrator, &StopArgs {
        targets: vec!["database".into()],
        remove_volumes: true,
        timeout: 5,
        ..Default::default()
    })?;

    assert_eq!(report.succeeded, 2);
    assert!(mock.get_runs().is_empty());

    Ok(())
}

#[test]
fn test_workflow_health_wait_between_categories() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let settings = write_stack(temp_dir.path())?;

    let mock = Arc::new(MockEngine::new());
    mock.set_available(&["podman"]);
    mock.respond("Health.Status", "healthy");
    let orchestrator = stack::build_orchestrator(&settings, mock.clone(), false)?;

    let args = StartArgs {
        filters: FilterArgs {
            categories: Some("database,backend".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let report = stack::start(&orchestrator, &args)?;
    assert!(report.is_success());

    let commands = mock.get_commands();
    let redis_health = commands
        .iter()
        .position(|c| c.contains("Health.Status") && c.ends_with(" redis"))
        .unwrap();
    let php_up = commands.iter().position(|c| c.contains("php.yml up")).unwrap();
    assert!(redis_health < php_up);

    Ok(())
}
