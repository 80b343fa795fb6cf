//! Interactive terminal front-end.
//!
//! SYSTEM CONTEXT
//! ==============
//! The shell is the Session Holder's root view in a terminal: with no
//! session it mounts the auth view, with one it mounts the feed view, and
//! every session change remounts. Input is line-based; each view waits on
//! stdin, the change feed, and session notifications at once.

#[cfg(test)]
#[path = "terminal_test.rs"]
mod terminal_test;

use std::fmt::Write as _;

use domain::{AuthAction, AuthForm, ChangeEvent, Session};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::backend::ChangeSubscription;
use crate::feed::{FeedController, FeedState};
use crate::session::SessionSubscription;
use crate::state::AppState;

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    Post(String),
    Sample,
    Refresh,
    SignOut,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`; type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl ShellCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown verbs or missing arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let command = match verb.to_ascii_lowercase().as_str() {
            "signin" | "login" => {
                let (email, password) = credentials(rest).ok_or(CommandError::Usage("signin <email> <password>"))?;
                Self::SignIn { email, password }
            }
            "signup" => {
                let (email, password) = credentials(rest).ok_or(CommandError::Usage("signup <email> <password>"))?;
                Self::SignUp { email, password }
            }
            "post" => Self::Post(rest.to_owned()),
            "sample" => Self::Sample,
            "refresh" | "reload" => Self::Refresh,
            "signout" | "logout" => Self::SignOut,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_owned())),
        };
        Ok(Some(command))
    }
}

fn credentials(rest: &str) -> Option<(String, String)> {
    let mut parts = rest.split_whitespace();
    let email = parts.next()?;
    let password = parts.next()?;
    parts.next().is_none().then(|| (email.to_owned(), password.to_owned()))
}

pub const AUTH_HELP: &str = "commands: signin <email> <password> | signup <email> <password> | quit";
pub const FEED_HELP: &str = "commands: post <text> | sample | refresh | signout | quit";

// =============================================================================
// RENDERING
// =============================================================================

#[must_use]
pub fn render_auth(form: &AuthForm) -> String {
    let mut out = String::from("== murmur: sign in or sign up ==\n");
    if form.is_submitting() {
        out.push_str("(submitting...)\n");
    }
    if let Some(message) = form.message() {
        let _ = writeln!(out, "{message}");
    }
    if let Some(error) = form.error() {
        let _ = writeln!(out, "error: {error}");
    }
    out.push_str(AUTH_HELP);
    out
}

#[must_use]
pub fn render_feed(state: &FeedState, session: Option<&Session>) -> String {
    let mut out = String::new();
    let who = session.map_or("", Session::email);
    let _ = writeln!(out, "== murmur: {who} ==");
    if state.loading {
        out.push_str("(loading...)\n");
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "error: {error}");
    }
    if state.posts.is_empty() && !state.loading {
        out.push_str("No posts yet. Type `sample` to create a sample post.\n");
    }
    for post in state.posts.iter() {
        let _ = writeln!(out, "{}  {}\n  {}", post.author_label(), post.created_label(), post.content);
    }
    out.push_str(FEED_HELP);
    out
}

/// One-line summary of a change for the `watch` output.
#[must_use]
pub fn describe_change(change: &ChangeEvent) -> String {
    match change {
        ChangeEvent::Insert(post) => format!("+ {} {}", post.id, post.content),
        ChangeEvent::Update(post) => format!("~ {} {}", post.id, post.content),
        ChangeEvent::Delete(id) => format!("- {id}"),
        ChangeEvent::Unrecognized(reason) => format!("? reloading ({reason})"),
    }
}

// =============================================================================
// SHELL LOOP
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
enum ViewExit {
    Remount,
    Quit,
}

type StdinLines = Lines<BufReader<Stdin>>;

/// Run until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
pub async fn run_shell(app: AppState) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sessions = app.sessions.subscribe();
    loop {
        let exit = if app.sessions.current().is_some() {
            feed_view(&app, &mut lines, &mut sessions).await?
        } else {
            auth_view(&app, &mut lines, &mut sessions).await?
        };
        if exit == ViewExit::Quit {
            return Ok(());
        }
    }
}

async fn auth_view(app: &AppState, lines: &mut StdinLines, sessions: &mut SessionSubscription) -> std::io::Result<ViewExit> {
    println!("{}", render_auth(&app.auth.form()));
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(ViewExit::Quit);
                };
                let (action, email, password) = match ShellCommand::parse(&line) {
                    Ok(Some(ShellCommand::SignIn { email, password })) => (AuthAction::SignIn, email, password),
                    Ok(Some(ShellCommand::SignUp { email, password })) => (AuthAction::SignUp, email, password),
                    Ok(Some(ShellCommand::Quit)) => return Ok(ViewExit::Quit),
                    Ok(Some(ShellCommand::Help)) => {
                        println!("{AUTH_HELP}");
                        continue;
                    }
                    Ok(None) => continue,
                    Ok(Some(_)) => {
                        println!("sign in first; {AUTH_HELP}");
                        continue;
                    }
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                let settled = app.auth.submit(action, &email, &password).await;
                if app.sessions.current().is_none() {
                    println!("{}", render_auth(&settled.value));
                }
            }
            snapshot = sessions.changed() => {
                let Some(snapshot) = snapshot else {
                    return Ok(ViewExit::Quit);
                };
                if snapshot.session.is_some() {
                    return Ok(ViewExit::Remount);
                }
            }
        }
    }
}

async fn feed_view(app: &AppState, lines: &mut StdinLines, sessions: &mut SessionSubscription) -> std::io::Result<ViewExit> {
    let feed = app.feed();
    let _ = feed.bootstrap_profile().await;
    // Failures land in the rendered error line.
    let _ = feed.fetch_posts().await;
    let mut subscription = match feed.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(error = %e, "realtime unavailable; feed will not update live");
            None
        }
    };
    println!("{}", render_feed(&feed.state(), feed.session().as_ref()));

    let exit = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break ViewExit::Quit;
                };
                match ShellCommand::parse(&line) {
                    Ok(Some(ShellCommand::Post(content))) => {
                        let _ = feed.submit_post(&content).await;
                    }
                    Ok(Some(ShellCommand::Sample)) => {
                        let _ = feed.create_sample_post().await;
                    }
                    Ok(Some(ShellCommand::Refresh)) => {
                        let _ = feed.fetch_posts().await;
                    }
                    Ok(Some(ShellCommand::SignOut)) => {
                        app.sessions.sign_out(app.backend.as_ref()).await;
                        continue;
                    }
                    Ok(Some(ShellCommand::Quit)) => break ViewExit::Quit,
                    Ok(Some(ShellCommand::Help)) => {
                        println!("{FEED_HELP}");
                        continue;
                    }
                    Ok(None) => continue,
                    Ok(Some(_)) => {
                        println!("already signed in; {FEED_HELP}");
                        continue;
                    }
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                }
                println!("{}", render_feed(&feed.state(), feed.session().as_ref()));
            }
            change = next_change(&mut subscription) => {
                match change {
                    Some(change) => {
                        feed.apply_change(&change).await;
                        println!("{}", render_feed(&feed.state(), feed.session().as_ref()));
                    }
                    None => {
                        warn!("change feed closed");
                        subscription = None;
                    }
                }
            }
            snapshot = sessions.changed() => {
                let Some(snapshot) = snapshot else {
                    break ViewExit::Quit;
                };
                match (&snapshot.session, feed.session()) {
                    (Some(next), Some(current)) if next.user.id == current.user.id => {
                        if let Some(subscription) = &subscription {
                            subscription.update_access_token(&next.access_token);
                        }
                        feed.update_session(snapshot.session.clone());
                    }
                    _ => break ViewExit::Remount,
                }
            }
        }
    };

    if let Some(subscription) = subscription {
        subscription.remove().await;
    }
    Ok(exit)
}

async fn next_change(subscription: &mut Option<ChangeSubscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

/// Print `controller`'s current feed.
pub fn print_feed(controller: &FeedController) {
    println!("{}", render_feed(&controller.state(), controller.session().as_ref()));
}
