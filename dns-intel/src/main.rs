//! DNS Intel CLI Application
//!
//! A command-line interface for analyzing a domain's DNS records, email
//! security, SSL certificate and propagation through the analysis API.
//! This CLI application provides a terminal front end to dns-intel-lib.

mod ui;

use chrono::Utc;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use dns_intel_lib::{
    certificate_reminder, default_history_path, export_file_name, load_env_config,
    parse_record_types, reminder_file_name, ApiClient, ConfigManager, DnsIntelError, EnvConfig,
    FileConfig, HistoryStore, Location, LookupController, LookupOptions, StaticChallenge,
    Submission, SubmissionState,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use ui::Spinner;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Public page used to build shareable links when none is configured.
const DEFAULT_SITE_URL: &str = "https://dnsintelligence.com/";

/// CLI arguments for dns-intel
#[derive(Parser, Debug)]
#[command(name = "dns-intel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Analyze a domain's DNS records, email security, SSL certificate and propagation")]
#[command(
    long_about = "Analyze a domain through the DNS intelligence API.\n\nLooks up the selected record types and, on request, email security, the SSL certificate, propagation across public resolvers and reverse DNS. Successful lookups are kept in a local history."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain to analyze (a pasted URL works too)
    #[arg(value_name = "DOMAIN", help_heading = "Lookup")]
    pub domain: Option<String>,

    /// Record types to query (comma-separated or multiple -t flags)
    #[arg(short = 't', long = "type", value_name = "TYPE", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Lookup")]
    pub record_types: Option<Vec<String>>,

    /// Check propagation across public resolvers
    #[arg(long = "propagation", help_heading = "Lookup")]
    pub propagation: bool,

    /// Reverse DNS for resolved addresses
    #[arg(long = "reverse", help_heading = "Lookup")]
    pub reverse: bool,

    /// Email security and provider enrichment
    #[arg(long = "enrichment", help_heading = "Lookup")]
    pub enrichment: bool,

    /// Inspect the SSL/TLS certificate
    #[arg(long = "ssl", help_heading = "Lookup")]
    pub ssl: bool,

    /// Pre-fill the domain from a shared link (?domain=...)
    #[arg(long = "url", value_name = "LINK", help_heading = "Lookup")]
    pub url: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long = "timeout", value_name = "MS", help_heading = "Request")]
    pub timeout: Option<String>,

    /// Extra attempts after a failed request
    #[arg(long = "max-retries", value_name = "N", help_heading = "Request")]
    pub max_retries: Option<String>,

    /// Pause between attempts in milliseconds
    #[arg(long = "retry-delay", value_name = "MS", help_heading = "Request")]
    pub retry_delay: Option<String>,

    /// Challenge token sent with the request
    #[arg(long = "token", value_name = "TOKEN", help_heading = "Request")]
    pub token: Option<String>,

    /// Analysis API endpoint
    #[arg(long = "endpoint", value_name = "URL", help_heading = "Request")]
    pub endpoint: Option<String>,

    /// Print the raw API result as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// Save the raw API result to a JSON file
    #[arg(long = "export-json", value_name = "FILE", num_args = 0..=1, help_heading = "Output")]
    pub export_json: Option<Option<String>>,

    /// Save an iCal reminder to renew the SSL certificate
    #[arg(long = "reminder", value_name = "FILE", num_args = 0..=1, help_heading = "Output")]
    pub reminder: Option<Option<String>>,

    /// List recent lookups
    #[arg(long = "history", help_heading = "History")]
    pub history: bool,

    /// Repeat a lookup from history with its saved options
    #[arg(long = "rerun", value_name = "DOMAIN", help_heading = "History")]
    pub rerun: Option<String>,

    /// Remove a domain from history
    #[arg(long = "delete", value_name = "DOMAIN", help_heading = "History")]
    pub delete: Option<String>,

    /// Remove all history entries
    #[arg(long = "clear-history", help_heading = "History")]
    pub clear_history: bool,

    /// Don't ask for confirmation
    #[arg(short = 'y', long = "yes", help_heading = "History")]
    pub yes: bool,

    /// Use a specific config file
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// History file location
    #[arg(long = "history-file", value_name = "FILE", help_heading = "Configuration")]
    pub history_file: Option<String>,

    /// Log progress to stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,

    /// Log request details to stderr
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

/// Settings resolved from config files, environment and flags.
#[derive(Debug, Clone, PartialEq)]
struct AppConfig {
    endpoint: Option<String>,
    site_url: String,
    token: Option<String>,
    options: LookupOptions,
    history_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            site_url: DEFAULT_SITE_URL.to_string(),
            token: None,
            options: LookupOptions::default(),
            history_path: None,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        ui::print_error(&e);
        process::exit(1);
    }

    init_tracing(&args);
    tracing::info!("dns-intel v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        ui::print_error(&e.user_message());
        process::exit(1);
    }
}

/// Install the log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(args)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_log_level(args: &Args) -> &'static str {
    if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    }
}

fn validate_args(args: &Args) -> Result<(), String> {
    let history_actions = [
        args.history,
        args.rerun.is_some(),
        args.delete.is_some(),
        args.clear_history,
    ]
    .iter()
    .filter(|&&x| x)
    .count();

    if history_actions > 1 {
        return Err(
            "Cannot combine history commands. Use only one of: --history, --rerun, --delete, --clear-history"
                .to_string(),
        );
    }

    if args.domain.is_some() && args.url.is_some() {
        return Err("Cannot specify both a DOMAIN and --url".to_string());
    }

    let has_target = args.domain.is_some() || args.url.is_some();
    if history_actions > 0 && has_target {
        return Err("History commands cannot be combined with a DOMAIN or --url".to_string());
    }

    if history_actions == 0 && !has_target {
        return Err(
            "You must specify a DOMAIN, a shared link with --url, or a history command (--history, --rerun, --delete, --clear-history)"
                .to_string(),
        );
    }

    Ok(())
}

async fn run(args: Args) -> Result<(), DnsIntelError> {
    let config = build_config(&args)?;
    let history = open_history(&config)?;

    if args.history {
        ui::print_history(&history.list(), Utc::now());
        return Ok(());
    }

    if let Some(domain) = &args.delete {
        history.delete(domain)?;
        ui::print_success(&format!("Removed {} from search history", domain));
        return Ok(());
    }

    if args.clear_history {
        return clear_history(&history, args.yes);
    }

    run_lookup(&args, config, history).await
}

fn open_history(config: &AppConfig) -> Result<HistoryStore, DnsIntelError> {
    match &config.history_path {
        Some(path) => Ok(HistoryStore::new(path)),
        None => HistoryStore::open_default(),
    }
}

fn clear_history(history: &HistoryStore, assume_yes: bool) -> Result<(), DnsIntelError> {
    let confirmed = assume_yes
        || ui::confirm(
            "Clear Search History",
            "Are you sure you want to clear all search history? This action cannot be undone.",
        );

    if !confirmed {
        ui::print_warning("Search history was not cleared (pass --yes to skip the prompt)");
        return Ok(());
    }

    history.clear()?;
    ui::print_success("Search history cleared successfully");
    Ok(())
}

async fn run_lookup(
    args: &Args,
    config: AppConfig,
    history: HistoryStore,
) -> Result<(), DnsIntelError> {
    let endpoint = config.endpoint.as_deref().ok_or_else(|| {
        DnsIntelError::config(
            "No API endpoint configured. Use --endpoint, DI_ENDPOINT or [api].endpoint in a config file",
        )
    })?;
    let client = ApiClient::new(endpoint)?;

    // A shared link carries the domain and becomes the starting location
    let (location, input) = match &args.url {
        Some(link) => {
            let location = Location::parse(link)?;
            let domain = location.initial_domain().ok_or_else(|| {
                DnsIntelError::invalid_domain(link.as_str(), "The link has no domain parameter")
            })?;
            (location, Some(domain))
        }
        None => (Location::parse(&config.site_url)?, args.domain.clone()),
    };

    let mut controller = LookupController::new(
        client,
        StaticChallenge::new(config.token.clone()),
        history,
        location,
    );

    // Options shown by the spinner; a rerun uses the ones saved with the entry
    let spinner_options = match &args.rerun {
        Some(domain) => controller
            .history()
            .get(domain)
            .map(|entry| entry.options)
            .unwrap_or_else(|| config.options.clone()),
        None => config.options.clone(),
    };

    let mut spinner: Option<Spinner> = None;
    let observer = |state: SubmissionState| match state {
        SubmissionState::Submitting => spinner = Spinner::start(&spinner_options),
        SubmissionState::Idle => {
            if let Some(s) = &spinner {
                s.halt();
            }
        }
        _ => {}
    };

    let outcome = match (&args.rerun, &input) {
        (Some(domain), _) => controller.rerun_from_history_observed(domain, observer).await,
        (None, Some(raw)) => controller.submit_observed(raw, &config.options, observer).await,
        (None, None) => Err(DnsIntelError::invalid_domain("", "Please enter a domain name")),
    };

    if let Some(s) = spinner.take() {
        s.stop().await;
    }

    let submission = outcome?;
    print_submission(args, &controller, &submission)?;
    write_exports(args, &submission)?;

    Ok(())
}

fn print_submission(
    args: &Args,
    controller: &LookupController<ApiClient, StaticChallenge>,
    submission: &Submission,
) -> Result<(), DnsIntelError> {
    if args.json {
        println!("{}", controller.export_json()?);
        return Ok(());
    }

    ui::print_result(&submission.view);
    println!(
        "{} {}",
        console::style("Share:").dim(),
        controller.location().current()
    );
    Ok(())
}

fn write_exports(args: &Args, submission: &Submission) -> Result<(), DnsIntelError> {
    if let Some(target) = &args.export_json {
        let path = target
            .clone()
            .unwrap_or_else(|| export_file_name(&submission.domain, Utc::now().date_naive()));
        write_file(&path, &dns_intel_lib::export_json(&submission.raw))?;
        ui::print_success(&format!("Analysis exported to {}", path));
    }

    if let Some(target) = &args.reminder {
        let Some(reminder) = submission.view.ssl.as_ref().and_then(|ssl| ssl.reminder.as_ref())
        else {
            ui::print_warning("No certificate expiry available; run with --ssl to create a reminder");
            return Ok(());
        };

        let calendar = certificate_reminder(&reminder.domain, &reminder.expiry)?;
        let path = target
            .clone()
            .unwrap_or_else(|| reminder_file_name(&reminder.domain));
        write_file(&path, &calendar)?;
        ui::print_success(&format!("Renewal reminder saved to {}", path));
    }

    Ok(())
}

fn write_file(path: &str, content: &str) -> Result<(), DnsIntelError> {
    std::fs::write(path, content)
        .map_err(|e| DnsIntelError::file_error(path, format!("Failed to write file: {}", e)))
}

fn build_config(args: &Args) -> Result<AppConfig, DnsIntelError> {
    let mut config = AppConfig::default();
    let env_config = load_env_config();

    // Create config manager for file discovery
    let config_manager = ConfigManager::new(args.verbose);

    // Step 1: Determine config file path and load config files
    if let Some(explicit_config_path) = &args.config {
        tracing::info!(path = %explicit_config_path, "using config file from --config");
        let file_config = config_manager.load_file(explicit_config_path)?;
        config = merge_file_config_into_app_config(config, file_config)?;
    } else if let Some(env_config_path) = &env_config.config {
        tracing::info!(path = %env_config_path, "using config file from DI_CONFIG");
        let file_config = config_manager.load_file(env_config_path)?;
        config = merge_file_config_into_app_config(config, file_config)?;
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => {
                config = merge_file_config_into_app_config(config, file_config)?;
            }
            Err(e) => tracing::warn!(error = %e, "config discovery failed"),
        }
    }

    // Step 2: Apply environment variables (DI_*)
    config = apply_environment_config(config, &env_config);

    // Step 3: Apply CLI arguments (highest precedence)
    config = apply_cli_args_to_config(config, args)?;

    Ok(config)
}

/// Merge FileConfig into AppConfig
fn merge_file_config_into_app_config(
    mut config: AppConfig,
    file_config: FileConfig,
) -> Result<AppConfig, DnsIntelError> {
    if let Some(api) = file_config.api {
        if let Some(endpoint) = api.endpoint {
            config.endpoint = Some(endpoint);
        }
        if let Some(site_url) = api.site_url {
            config.site_url = site_url;
        }
    }

    if let Some(defaults) = file_config.defaults {
        let mut options = config.options;
        if let Some(types) = &defaults.record_types {
            options = options.with_record_types(parse_record_types(types.iter().map(String::as_str))?);
        }
        if let Some(propagation) = defaults.check_propagation {
            options.check_propagation = propagation;
        }
        if let Some(reverse) = defaults.reverse_dns {
            options.reverse_dns = reverse;
        }
        if let Some(enrichment) = defaults.enrichment {
            options.enrichment = enrichment;
        }
        if let Some(ssl) = defaults.ssl_inspection {
            options.ssl_inspection = ssl;
        }
        if defaults.timeout.is_some() {
            options = options.with_timeout_text(defaults.timeout.as_deref());
        }
        if defaults.max_retries.is_some() {
            options = options.with_max_retries_text(defaults.max_retries.as_deref());
        }
        if defaults.retry_delay.is_some() {
            options = options.with_retry_delay_text(defaults.retry_delay.as_deref());
        }
        config.options = options;
    }

    if let Some(path) = file_config.history.and_then(|h| h.path) {
        config.history_path = Some(PathBuf::from(path));
    }

    Ok(config)
}

/// Apply DI_* environment variables to config.
///
/// Values were already validated by the library's load_env_config().
fn apply_environment_config(mut config: AppConfig, env_config: &EnvConfig) -> AppConfig {
    if let Some(endpoint) = &env_config.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(site_url) = &env_config.site_url {
        config.site_url = site_url.clone();
    }
    if let Some(token) = &env_config.token {
        config.token = Some(token.clone());
    }
    if let Some(types) = &env_config.record_types {
        config.options = config.options.with_record_types(types.clone());
    }
    if env_config.timeout.is_some() {
        config.options = config.options.with_timeout_text(env_config.timeout.as_deref());
    }
    if env_config.max_retries.is_some() {
        config.options = config
            .options
            .with_max_retries_text(env_config.max_retries.as_deref());
    }
    if env_config.retry_delay.is_some() {
        config.options = config
            .options
            .with_retry_delay_text(env_config.retry_delay.as_deref());
    }
    if let Some(path) = &env_config.history_file {
        config.history_path = Some(PathBuf::from(path));
    }

    config
}

/// Apply CLI arguments to config (highest precedence).
fn apply_cli_args_to_config(mut config: AppConfig, args: &Args) -> Result<AppConfig, DnsIntelError> {
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(token) = &args.token {
        config.token = Some(token.clone());
    }

    if let Some(types) = &args.record_types {
        let parsed = parse_record_types(types.iter().map(String::as_str))?;
        config.options = config.options.with_record_types(parsed);
    }

    // Only override boolean settings when the user explicitly passes the flag.
    // Without this guard, the default (false) would always overwrite config/env values.
    if args.propagation {
        config.options.check_propagation = true;
    }
    if args.reverse {
        config.options.reverse_dns = true;
    }
    if args.enrichment {
        config.options.enrichment = true;
    }
    if args.ssl {
        config.options.ssl_inspection = true;
    }

    if args.timeout.is_some() {
        config.options = config.options.with_timeout_text(args.timeout.as_deref());
    }
    if args.max_retries.is_some() {
        config.options = config.options.with_max_retries_text(args.max_retries.as_deref());
    }
    if args.retry_delay.is_some() {
        config.options = config.options.with_retry_delay_text(args.retry_delay.as_deref());
    }

    if let Some(path) = &args.history_file {
        config.history_path = Some(PathBuf::from(path));
    } else if config.history_path.is_none() {
        config.history_path = default_history_path();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_intel_lib::{ApiConfig, DefaultsConfig, HistoryConfig, RecordType};

    // Helper function with all required fields
    fn create_test_args() -> Args {
        Args {
            domain: None,
            record_types: None,
            propagation: false,
            reverse: false,
            enrichment: false,
            ssl: false,
            url: None,
            timeout: None,
            max_retries: None,
            retry_delay: None,
            token: None,
            endpoint: None,
            json: false,
            export_json: None,
            reminder: None,
            history: false,
            rerun: None,
            delete: None,
            clear_history: false,
            yes: false,
            config: None,
            history_file: None,
            verbose: false,
            debug: false,
        }
    }

    #[test]
    fn test_validate_args_requires_something_to_do() {
        let args = create_test_args();
        let err = validate_args(&args).unwrap_err();
        assert!(err.contains("You must specify a DOMAIN"));

        let args = Args {
            domain: Some("example.com".to_string()),
            ..create_test_args()
        };
        assert!(validate_args(&args).is_ok());

        let args = Args {
            history: true,
            ..create_test_args()
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_conflicts() {
        let args = Args {
            domain: Some("example.com".to_string()),
            url: Some("https://dns.example.com/?domain=example.org".to_string()),
            ..create_test_args()
        };
        assert!(validate_args(&args).unwrap_err().contains("--url"));

        let args = Args {
            history: true,
            clear_history: true,
            ..create_test_args()
        };
        assert!(validate_args(&args)
            .unwrap_err()
            .contains("Cannot combine history commands"));

        let args = Args {
            rerun: Some("example.com".to_string()),
            domain: Some("example.org".to_string()),
            ..create_test_args()
        };
        assert!(validate_args(&args)
            .unwrap_err()
            .contains("cannot be combined with a DOMAIN"));
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(&create_test_args()), "warn");

        let args = Args {
            verbose: true,
            ..create_test_args()
        };
        assert_eq!(default_log_level(&args), "info");

        let args = Args {
            verbose: true,
            debug: true,
            ..create_test_args()
        };
        assert_eq!(default_log_level(&args), "debug");
    }

    #[test]
    fn test_merge_file_config() {
        let file_config = FileConfig {
            api: Some(ApiConfig {
                endpoint: Some("https://api.example.com/analyze".to_string()),
                site_url: Some("https://dns.example.com/".to_string()),
            }),
            defaults: Some(DefaultsConfig {
                record_types: Some(vec!["A".to_string(), "mx".to_string()]),
                enrichment: Some(true),
                timeout: Some("8000".to_string()),
                max_retries: Some("abc".to_string()),
                ..Default::default()
            }),
            history: Some(HistoryConfig {
                path: Some("/tmp/history.json".to_string()),
            }),
        };

        let config = merge_file_config_into_app_config(AppConfig::default(), file_config).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("https://api.example.com/analyze"));
        assert_eq!(config.site_url, "https://dns.example.com/");
        assert_eq!(config.options.record_types, vec![RecordType::A, RecordType::Mx]);
        assert!(config.options.enrichment);
        assert!(!config.options.ssl_inspection);
        assert_eq!(config.options.timeout, 8000);
        assert_eq!(config.options.max_retries, dns_intel_lib::DEFAULT_MAX_RETRIES);
        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/history.json")));
    }

    #[test]
    fn test_merge_file_config_rejects_unknown_type() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                record_types: Some(vec!["BOGUS".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(merge_file_config_into_app_config(AppConfig::default(), file_config).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let config = AppConfig {
            endpoint: Some("https://file.example.com/".to_string()),
            ..AppConfig::default()
        };
        let env_config = EnvConfig {
            endpoint: Some("https://env.example.com/".to_string()),
            token: Some("tok".to_string()),
            record_types: Some(vec![RecordType::Txt]),
            retry_delay: Some("250".to_string()),
            ..Default::default()
        };

        let config = apply_environment_config(config, &env_config);
        assert_eq!(config.endpoint.as_deref(), Some("https://env.example.com/"));
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.options.record_types, vec![RecordType::Txt]);
        assert_eq!(config.options.retry_delay, 250);
        assert_eq!(config.site_url, DEFAULT_SITE_URL);
    }

    #[test]
    fn test_cli_overrides_environment() {
        let mut config = AppConfig {
            endpoint: Some("https://env.example.com/".to_string()),
            ..AppConfig::default()
        };
        config.options.enrichment = true;

        let args = Args {
            domain: Some("example.com".to_string()),
            endpoint: Some("https://cli.example.com/".to_string()),
            record_types: Some(vec!["aaaa".to_string(), "A".to_string(), "AAAA".to_string()]),
            ssl: true,
            timeout: Some("3000ms".to_string()),
            history_file: Some("/tmp/cli-history.json".to_string()),
            ..create_test_args()
        };

        let config = apply_cli_args_to_config(config, &args).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("https://cli.example.com/"));
        assert_eq!(config.options.record_types, vec![RecordType::Aaaa, RecordType::A]);
        assert!(config.options.ssl_inspection);
        // Not passed on the command line, so the lower layer's value stays
        assert!(config.options.enrichment);
        assert_eq!(config.options.timeout, 3000);
        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/cli-history.json")));
    }

    #[test]
    fn test_cli_rejects_unknown_record_type() {
        let args = Args {
            domain: Some("example.com".to_string()),
            record_types: Some(vec!["A".to_string(), "XYZ".to_string()]),
            ..create_test_args()
        };
        let err = apply_cli_args_to_config(AppConfig::default(), &args).unwrap_err();
        assert!(err.user_message().contains("XYZ"));
    }
}
