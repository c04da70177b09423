use clap::{Arg, Command};
use log::LevelFilter;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use verimail::api::{self, AppState};
use verimail::bulk::BulkProcessor;
use verimail::usage::{ApiKey, UsageStore, STATUS_ACTIVE};
use verimail::{Config, EmailValidator, VerifyOptions};

#[tokio::main]
async fn main() {
    let matches = Command::new("verimail")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Email validation API: syntax checks, disposable domain detection and quality scoring")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/verimail.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .value_name("EMAIL")
                .help("Validate a single address, print the JSON result and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("bulk")
                .long("bulk")
                .value_name("FILE")
                .help("Validate one address per line from FILE, print a JSON array and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Use strict scoring with --check and --bulk")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-domains")
                .long("list-domains")
                .help("List the disposable domains in effect and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("add-api-key")
                .long("add-api-key")
                .value_name("KEY")
                .help("Create or update an API key in the key store and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quota")
                .long("quota")
                .value_name("N")
                .help("Daily quota for --add-api-key")
                .value_parser(clap::value_parser!(u32))
                .default_value("100"),
        )
        .arg(
            Arg::new("plan")
                .long("plan")
                .value_name("PLAN")
                .help("Plan for --add-api-key")
                .default_value("free"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDR")
                .help("Override the listen address (host:port)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/verimail.yaml");
    let config_exists = Path::new(config_path).exists();

    let config = match load_config(config_path, config_exists) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        config.logging.level.parse().unwrap_or(LevelFilter::Info)
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if !config_exists {
        log::warn!("Configuration file '{config_path}' not found, using default configuration");
    }

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    if let Some(key) = matches.get_one::<String>("add-api-key") {
        let quota = matches.get_one::<u32>("quota").copied().unwrap_or(100);
        let plan = matches
            .get_one::<String>("plan")
            .cloned()
            .unwrap_or_else(|| "free".to_string());
        if let Err(e) = add_api_key(&config, key, quota, plan) {
            eprintln!("Failed to store API key: {e:#}");
            process::exit(1);
        }
        return;
    }

    let options = VerifyOptions {
        strict: matches.get_flag("strict"),
    };

    if let Some(email) = matches.get_one::<String>("check") {
        let validator = build_validator(&config);
        let result = validator.validate(email, options).await;
        print_json(&result);
        return;
    }

    if let Some(path) = matches.get_one::<String>("bulk") {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Failed to read {path}: {e}");
                process::exit(1);
            }
        };
        let emails: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        let processor = BulkProcessor::new(Arc::new(build_validator(&config)));
        let results = processor.process(emails, options).await;
        print_json(&results);
        return;
    }

    if matches.get_flag("list-domains") {
        let validator = build_validator(&config);
        for domain in validator.disposable_domains().sorted() {
            println!("{domain}");
        }
        return;
    }

    let bind = matches
        .get_one::<String>("bind")
        .cloned()
        .unwrap_or_else(|| config.bind_addr());

    if let Err(e) = run_server(config, &bind).await {
        log::error!("Server error: {e:#}");
        process::exit(1);
    }
}

async fn run_server(config: Config, bind: &str) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    log::info!(
        "Loaded {} disposable domains, MX checking: {:?}, auth: {}",
        state.validator.disposable_domains().len(),
        state.validator.mx_checker().mode(),
        state.config.auth.enabled
    );

    let mx = state.validator.mx_checker().clone();
    if mx.is_enabled() {
        let period = Duration::from_secs(state.config.dns.cache_ttl_seconds.max(60));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = mx.clean_cache().await;
                if removed > 0 {
                    log::debug!("Evicted {removed} expired MX cache entries");
                }
            }
        });
    }

    let app = api::router(state);
    let listener = api::bind_listener(bind).await?;
    log::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}

fn build_validator(config: &Config) -> EmailValidator {
    match EmailValidator::from_config(config) {
        Ok(validator) => validator,
        Err(e) => {
            eprintln!("Failed to initialise validator: {e:#}");
            process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialise result: {e}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("Testing configuration...");

    if let Err(e) = config.bind_addr().to_socket_addrs() {
        println!("Invalid listen address {}: {e}", config.bind_addr());
        process::exit(1);
    }

    match EmailValidator::from_config(config) {
        Ok(validator) => {
            println!(
                "Disposable domains: {}",
                validator.disposable_domains().len()
            );
            println!("MX checking: {:?}", config.dns.mode);
        }
        Err(e) => {
            println!("Configuration validation failed: {e:#}");
            process::exit(1);
        }
    }

    if config.auth.enabled {
        if let Err(e) = UsageStore::open(&config.auth.database_path) {
            println!("API key store unavailable: {e:#}");
            process::exit(1);
        }
        println!("API key store: {}", config.auth.database_path);
    }

    println!("Plans: {}", config.plans.keys().cloned().collect::<Vec<_>>().join(", "));
    println!("Configuration OK");
}

fn add_api_key(config: &Config, key: &str, quota: u32, plan: String) -> anyhow::Result<()> {
    if !config.plans.contains_key(&plan) {
        anyhow::bail!("Unknown plan '{plan}'");
    }
    let store = UsageStore::open(&config.auth.database_path)?;
    store.upsert_api_key(&ApiKey {
        key: key.to_string(),
        status: STATUS_ACTIVE.to_string(),
        daily_quota: quota,
        plan,
    })?;
    println!("API key stored in {}", config.auth.database_path);
    Ok(())
}

fn load_config(path: &str, exists: bool) -> anyhow::Result<Config> {
    if exists {
        Config::from_file(path)
    } else {
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => println!("Default configuration written to: {path}"),
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}
