use std::env;

use affordability::telemetry;

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = telemetry::init(telemetry::DEFAULT_LOG_LEVEL) {
            eprintln!("{e}");
            std::process::exit(1);
        }
        if let Err(e) = affordability::api::run_http_server(port).await {
            tracing::error!(error = %e, "server error");
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = affordability::api::run_cli() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
