use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "EDRS";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Analysis backend used when `EDRS_API_BASE_URL` is unset.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Path of the analysis endpoint, appended to the base URL.
pub const ANALYZE_PATH: &str = "/api/v1/edrs/analyze";

/// Environment variable overriding the backend base URL.
pub const API_BASE_URL_ENV: &str = "EDRS_API_BASE_URL";

/// Environment variable carrying a bearer token for the backend.
pub const API_TOKEN_ENV: &str = "EDRS_API_TOKEN";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "edrs_lib=info,edrs=info,warn"
}

/// Resolve the backend base URL: environment first, then the local default.
/// Trailing slashes are trimmed so paths can be appended directly.
pub fn api_base_url() -> String {
    resolve_base_url(std::env::var(API_BASE_URL_ENV).ok().as_deref())
}

fn resolve_base_url(from_env: Option<&str>) -> String {
    let raw = from_env
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL);
    raw.trim_end_matches('/').to_string()
}

/// Full URL of the analysis endpoint for a given base.
pub fn analyze_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), ANALYZE_PATH)
}

/// Get the application data directory.
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("edrs")
}

/// File that mirrors the logged-in session between CLI invocations.
pub fn session_file() -> PathBuf {
    app_data_dir().join("session.json")
}
