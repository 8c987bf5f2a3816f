use healthcare_planner::{AppState, Collaborators, Planner, create_app};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing; LOG_FORMAT=pretty for development, JSON otherwise
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "healthcare_planner=debug,chain_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let (config, planner) =
        match Planner::bootstrap(|key| std::env::var(key).ok(), Collaborators::from_config) {
            Ok(bootstrapped) => bootstrapped,
            Err(e) => {
                error!("Configuration error: {}", e);
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
    info!(?config, "Configuration loaded");

    let state = AppState::new(planner, config.transcript_budget);
    let app = create_app(state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("Healthcare planner starting on {}", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Plan endpoint: POST http://{}/consultations/{{id}}/plan", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
