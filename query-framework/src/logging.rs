use serde_json::json;
use tracing_subscriber::{prelude::*, registry, EnvFilter};

/// Installs the global tracing subscriber.
///
/// The filter defaults to `info` for dependencies and `debug` for the executable's own crate,
/// and can be overridden through `RUST_LOG`.
pub fn init(executable_name: &str, json: bool) {
    let crate_target = executable_name.replace('-', "_");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(format!("info,{crate_target}=debug"))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let log_default_layer = (!json).then(tracing_subscriber::fmt::layer);
    let log_json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
    });

    registry()
        .with(env_filter)
        .with(log_default_layer)
        .with(log_json_layer)
        .init();
}

/// Prints a single JSON-formatted error line to stdout.
///
/// Used for failures that happen before the subscriber is installed.
pub fn error_log(target: &str, message: &str) {
    println!("{}", error_line(target, message));
}

fn error_line(target: &str, message: &str) -> String {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        "level": "ERROR",
        "fields": { "message": message },
        "target": target,
    })
    .to_string()
}
