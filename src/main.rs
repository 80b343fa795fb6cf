use clap::{Args, Parser, Subcommand};
use domain::{AuthAction, FeedError};
use murmur::config::{ClientConfig, ConfigError};
use murmur::error::BackendError;
use murmur::state::AppState;
use murmur::terminal::{self, describe_change};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Feed(#[from] FeedError),
    #[error("sign in failed: {0}")]
    Auth(String),
    #[error("missing credentials; pass --email/--password or set MURMUR_EMAIL/MURMUR_PASSWORD")]
    MissingCredentials,
    #[error("realtime unavailable for this session")]
    NoSubscription,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "murmur", about = "Terminal client for the murmur feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session: sign in, read, post, follow live updates.
    Shell,
    /// Register an account; prints the verification notice.
    Signup(CredentialArgs),
    /// Print the feed once.
    Feed(CredentialArgs),
    /// Create a post and print the feed.
    Post {
        #[command(flatten)]
        credentials: CredentialArgs,
        /// Post text. Blank text is ignored.
        content: String,
    },
    /// Print changes to your posts as they happen.
    Watch(CredentialArgs),
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long, env = "MURMUR_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "MURMUR_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let app = AppState::from_config(&config)?;
    app.sessions
        .start(app.backend.as_ref(), config.refresh_token.as_deref())
        .await;
    let refresh = app.sessions.clone().spawn_refresh(app.backend.clone());

    let result = match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => terminal::run_shell(app.clone()).await.map_err(CliError::from),
        Command::Signup(credentials) => run_signup(&app, credentials).await,
        Command::Feed(credentials) => run_feed(&app, credentials).await,
        Command::Post { credentials, content } => run_post(&app, credentials, &content).await,
        Command::Watch(credentials) => run_watch(&app, credentials).await,
    };
    refresh.abort();
    result
}

async fn run_signup(app: &AppState, credentials: CredentialArgs) -> Result<(), CliError> {
    let (email, password) = credentials.require()?;
    let settled = app.auth.submit(AuthAction::SignUp, &email, &password).await;
    if let Some(error) = settled.value.error() {
        return Err(CliError::Auth(error.to_owned()));
    }
    if let Some(message) = settled.value.message() {
        println!("{message}");
    }
    Ok(())
}

async fn run_feed(app: &AppState, credentials: CredentialArgs) -> Result<(), CliError> {
    ensure_signed_in(app, credentials).await?;
    let feed = app.feed();
    let _ = feed.bootstrap_profile().await;
    feed.fetch_posts().await?;
    terminal::print_feed(&feed);
    Ok(())
}

async fn run_post(app: &AppState, credentials: CredentialArgs, content: &str) -> Result<(), CliError> {
    ensure_signed_in(app, credentials).await?;
    let feed = app.feed();
    let _ = feed.bootstrap_profile().await;
    feed.fetch_posts().await?;
    if feed.submit_post(content).await?.is_none() {
        tracing::info!("nothing to post");
    }
    terminal::print_feed(&feed);
    Ok(())
}

async fn run_watch(app: &AppState, credentials: CredentialArgs) -> Result<(), CliError> {
    ensure_signed_in(app, credentials).await?;
    let feed = app.feed();
    let _ = feed.bootstrap_profile().await;
    feed.fetch_posts().await?;
    terminal::print_feed(&feed);

    let subscription = feed.subscribe().await?.ok_or(CliError::NoSubscription)?;
    let mut sessions = app.sessions.subscribe();
    tokio::select! {
        end = feed.follow(subscription, &mut sessions, |change, _| println!("{}", describe_change(change))) => {
            tracing::info!(?end, "stopped watching");
        }
        _ = tokio::signal::ctrl_c() => {}
    }
    Ok(())
}

/// Use the restored session when there is one, otherwise sign in.
async fn ensure_signed_in(app: &AppState, credentials: CredentialArgs) -> Result<(), CliError> {
    if app.sessions.current().is_some() {
        return Ok(());
    }
    let (email, password) = credentials.require()?;
    let settled = app.auth.submit(AuthAction::SignIn, &email, &password).await;
    if app.sessions.current().is_some() {
        return Ok(());
    }
    let reason = settled
        .value
        .error()
        .map(str::to_owned)
        .or_else(|| settled.soft.first().map(|e| e.detail().to_owned()))
        .unwrap_or_else(|| "no session returned".to_owned());
    Err(CliError::Auth(reason))
}

impl CredentialArgs {
    fn require(self) -> Result<(String, String), CliError> {
        match (self.email, self.password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(CliError::MissingCredentials),
        }
    }
}
