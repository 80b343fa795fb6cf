//! Murmur web host: serves the Leptos client and its public settings.

mod routes;
mod state;

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] state::StateError),
    #[error("invalid PORT: {0}")]
    Port(String),
    #[error("{0}")]
    Leptos(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port: u16 = match std::env::var("PORT") {
        Ok(raw) => raw.trim().parse().map_err(|_| ServerError::Port(raw))?,
        Err(_) => 3000,
    };

    let state = state::AppState::from_env()?;
    tracing::info!(supabase_url = %state.public.supabase_url, "public backend settings loaded");

    let app = routes::leptos_app(state).map_err(ServerError::Leptos)?;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "murmur listening");
    axum::serve(listener, app).await?;
    Ok(())
}
