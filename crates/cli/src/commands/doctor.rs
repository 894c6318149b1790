//! Doctor command - validate configuration and show status

use anyhow::Result;
use epo_reputation_adapters::epo::EpoClient;
use epo_reputation_domain::FileTypeFilter;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    epo: CheckResult,
    credentials: CheckResult,
    scan: CheckResult,
    token: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        epo: CheckResult::error("Not checked"),
        credentials: CheckResult::error("Not checked"),
        scan: CheckResult::error("Not checked"),
        token: CheckResult::ok("Skipped (use --token)"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.epo = check_epo(config);
        report.credentials = check_credentials(config);
        report.scan = check_scan(config);

        if args.token {
            report.token = check_token(config).await;
        }
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.epo,
        &report.credentials,
        &report.scan,
        &report.token,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_epo(config: &AppConfig) -> CheckResult {
    let epo = &config.epo;

    if epo.url.trim().is_empty() {
        return CheckResult::error("No ePO URL configured");
    }

    if !epo.url.starts_with("https://") && !epo.url.starts_with("http://") {
        return CheckResult::error(format!("ePO URL must start with http(s)://: {}", epo.url));
    }

    let details = serde_json::json!({
        "url": epo.url,
        "timeout_secs": epo.timeout_secs,
        "hashes_per_request": epo.hashes_per_request,
        "default_reputation": epo.default_reputation().label(),
        "verify_tls": epo.verify_tls,
    });

    if epo.timeout_secs == 0 {
        return CheckResult::error("timeout_secs must be positive").with_details(details);
    }

    if !epo.verify_tls {
        return CheckResult::warn(format!(
            "URL: {}, TLS certificate verification disabled",
            epo.url
        ))
        .with_details(details);
    }

    CheckResult::ok(format!("URL: {}", epo.url)).with_details(details)
}

fn check_credentials(config: &AppConfig) -> CheckResult {
    let epo = &config.epo;

    if epo.username.trim().is_empty() {
        return CheckResult::error("No ePO username configured");
    }

    // Only report whether the password is present, never its value
    match epo.load_password() {
        Ok(_) => CheckResult::ok(format!(
            "Username: {}, Password: {} (set)",
            epo.username, epo.password_env
        )),
        Err(e) => CheckResult::error(format!("Username: {}, {}", epo.username, e)),
    }
}

fn check_scan(config: &AppConfig) -> CheckResult {
    let filter: FileTypeFilter = config
        .scan
        .file_types
        .parse()
        .unwrap_or_else(|never| match never {});

    if filter.is_all() {
        CheckResult::ok("File types: all")
    } else {
        CheckResult::ok(format!("File types: {}", filter.allowed().join(", ")))
    }
}

async fn check_token(config: &AppConfig) -> CheckResult {
    let client = match config
        .epo
        .client_config()
        .and_then(|settings| Ok(EpoClient::new(settings)?))
    {
        Ok(client) => client,
        Err(e) => return CheckResult::error(format!("Cannot connect: {}", e)),
    };

    match client.security_token().await {
        Ok(_) => CheckResult::ok("Security token acquired"),
        Err(e) => CheckResult::error(format!("Failed to fetch security token: {}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("epo-reputation Doctor Report");
    println!("============================");
    println!();

    print_check("Config", &report.config);
    print_check("ePO Server", &report.epo);
    print_check("Credentials", &report.credentials);
    print_check("Scan", &report.scan);
    print_check("Token", &report.token);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall != "error" {
        println!();
        println!("Ready to send! Try: epo-reputation send <dir> --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
