//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::openai::create_client_with;
use crate::session::SessionStore;
use console::style;
use std::process::Command;
use std::time::Duration;

/// Timeout for endpoint probes.
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    /// Same check, reported as a warning instead of an error.
    fn optional(mut self) -> Self {
        if self.status == CheckStatus::Error {
            self.status = CheckStatus::Warning;
        }
        self
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Youtubot Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let tools = vec![
        check_tool("yt-dlp", &["--version"], install_hint_ytdlp()),
        check_tool("ffmpeg", &["-version"], install_hint_ffmpeg()).optional(),
        check_tool(&settings.transcription.whisper_binary, &["--help"], install_hint_whisper()).optional(),
    ];
    print_section("External Tools", &tools);
    checks.extend(tools);

    let mut endpoints = vec![
        check_endpoint("Chat model", settings.llm.resolved_api_base().as_deref(), &settings.llm.model).await,
        check_endpoint(
            "Embedding model",
            settings.embedding.api_base.as_deref(),
            &settings.embedding.model,
        )
        .await,
    ];
    if settings.llm.resolved_api_base().is_none() || settings.embedding.api_base.is_none() {
        endpoints.push(check_openai_api_key());
    }
    print_section("Model Endpoints", &endpoints);
    checks.extend(endpoints);

    let dirs = check_directories(settings);
    print_section("Directories", &dirs);
    checks.extend(dirs);

    let config = vec![check_config_file()];
    print_section("Configuration", &config);
    checks.extend(config);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Youtubot.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Youtubot is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, args: &[&str], hint: &str) -> CheckResult {
    match Command::new(name).args(args).output() {
        Ok(output) if output.status.success() => {
            // Try to extract version from first line
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            CheckResult::ok(name, &truncate(&version, 50))
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::error(name, "not found", hint),
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// List the endpoint's models and look for the configured one.
async fn check_endpoint(name: &str, api_base: Option<&str>, model: &str) -> CheckResult {
    let shown = api_base.unwrap_or("https://api.openai.com/v1");

    let client = match create_client_with(api_base, ENDPOINT_TIMEOUT) {
        Ok(client) => client,
        Err(e) => return CheckResult::error(name, &e.to_string(), "Check the [llm] and [embedding] sections"),
    };

    match client.models().list().await {
        Ok(list) => {
            // Ollama reports tagged names such as "llama3:latest"
            let found = list
                .data
                .iter()
                .any(|m| m.id == model || m.id.split(':').next() == Some(model));
            if found {
                CheckResult::ok(name, &format!("{} at {}", model, shown))
            } else {
                CheckResult::warning(
                    name,
                    &format!("{} reachable, but '{}' is not listed", shown, model),
                    &model_hint(api_base, model),
                )
            }
        }
        Err(e) => CheckResult::error(
            name,
            &format!("{} unreachable: {}", shown, truncate(&e.to_string(), 80)),
            "Start the model server or set api_base in the config file",
        ),
    }
}

fn model_hint(api_base: Option<&str>, model: &str) -> String {
    match api_base {
        Some(base) if base.contains("11434") => format!("Pull it with: ollama pull {}", model),
        _ => "Check the model name in the config file".to_string(),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...' or point api_base at a local server",
        ),
    }
}

/// Check data and session directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let store = SessionStore::new(settings.sessions_dir());
    match store.list() {
        Ok(names) => results.push(CheckResult::ok(
            "Sessions",
            &format!("{} ({} saved)", store.root().display(), names.len()),
        )),
        Err(e) => results.push(CheckResult::error(
            "Sessions",
            &format!("{}: {}", store.root().display(), e),
            "Check permissions on the sessions directory",
        )),
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if !config_path.exists() {
        return CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: youtubot config edit",
        );
    }

    match Settings::load_from(Some(&config_path)) {
        Ok(_) => CheckResult::ok("Config file", &format!("{}", config_path.display())),
        Err(e) => CheckResult::error(
            "Config file",
            &format!("{} does not parse: {}", config_path.display(), e),
            "Fix with: youtubot config edit",
        ),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Needed for local transcription. Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Needed for local transcription. Install with: sudo apt install ffmpeg"
    } else {
        "Needed for local transcription. Install from: https://ffmpeg.org/download.html"
    }
}

fn install_hint_whisper() -> &'static str {
    "Needed for videos without captions. Install with: pip install openai-whisper"
}
