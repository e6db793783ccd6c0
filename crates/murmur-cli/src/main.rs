//! Murmur terminal client.
//!
//! # Usage
//!
//! ```bash
//! export MURMUR_ACCESS_TOKEN=... MURMUR_CSRF_TOKEN=...
//!
//! # Private chat with user 2
//! murmur-cli private alice 2
//!
//! # Group chat
//! murmur-cli --server-url https://chat.example.com group alice rust
//! ```

use std::io::Write;

use clap::{Parser, Subcommand};
use murmur_cli::{Input, input::wire_id, parse_line, render_action, render_members};
use murmur_client::{
    ClientConfig, HttpDirectory, Runtime, RuntimeHandle, SystemEnv, WsConnector, refresh_roster,
};
use murmur_core::{ChannelAction, ChatContext, SharedCredentials};
use murmur_proto::Credentials;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Murmur chat client
#[derive(Parser, Debug)]
#[command(name = "murmur-cli")]
#[command(about = "Line-oriented client for Murmur chat channels")]
#[command(version)]
struct Args {
    /// Server base URL (overrides MURMUR_SERVER_URL)
    #[arg(short, long)]
    server_url: Option<String>,

    /// Access token
    #[arg(long, env = "MURMUR_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Anti-forgery token
    #[arg(long, env = "MURMUR_CSRF_TOKEN", hide_env_values = true)]
    csrf_token: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    chat: Chat,
}

#[derive(Subcommand, Debug)]
enum Chat {
    /// Open a private chat
    Private {
        /// Your username
        username: String,
        /// User id of the other participant
        counterpart: String,
    },
    /// Open a group chat
    Group {
        /// Your username
        username: String,
        /// Group name
        group: String,
    },
}

impl Chat {
    fn context(&self) -> ChatContext {
        match self {
            Self::Private { username, counterpart } => {
                ChatContext::private(username.as_str(), wire_id(counterpart))
            },
            Self::Group { username, group } => ChatContext::group(username.as_str(), group.as_str()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = ClientConfig::from_env()?;
    if let Some(server_url) = args.server_url {
        config.server_url = server_url;
        config.validate()?;
    }

    let credentials = SharedCredentials::new(Credentials::new(args.access_token, args.csrf_token));
    let directory = HttpDirectory::new(&config, credentials.clone())?;
    let connector = WsConnector::new(&config);

    tracing::info!(endpoint = connector.endpoint(), "murmur client starting");

    let (runtime, handle) = Runtime::new(SystemEnv::new(), credentials, connector, &config);
    let runtime = tokio::spawn(runtime.run());

    let printer = tokio::spawn(print_actions(handle.subscribe()));

    let context = args.chat.context();
    handle.open(context.clone()).await?;
    if let Some(group) = context.group_name() {
        refresh(&handle, &directory, group, context.self_identity()).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(error) => {
                say(&error.to_string());
                continue;
            },
        };

        let outcome = match input {
            Input::Message(text) => handle.send_message(text).await,
            Input::Add(member) => handle.add_member(member).await,
            Input::Remove(user_id) => handle.remove_member(user_id).await,
            Input::Members => {
                let view = handle.view().await?;
                say(&render_members(&view.members));
                Ok(())
            },
            Input::Refresh => {
                match context.group_name() {
                    Some(group) => {
                        refresh(&handle, &directory, group, context.self_identity()).await;
                    },
                    None => say("not a group chat"),
                }
                Ok(())
            },
            Input::Quit => break,
        };
        if let Err(error) = outcome {
            say(&error.to_string());
        }
    }

    handle.close().await?;
    handle.shutdown().await?;
    runtime.await?;
    printer.abort();

    Ok(())
}

async fn refresh(
    handle: &RuntimeHandle,
    directory: &HttpDirectory<SharedCredentials>,
    group: &str,
    self_identity: &str,
) {
    let roster = match refresh_roster(directory, group, self_identity).await {
        Ok(roster) => roster,
        Err(error) => {
            tracing::warn!(group, %error, "roster refresh failed");
            say(&format!("roster refresh failed: {error}"));
            return;
        },
    };
    if let Err(error) = handle.refresh_roster(group, roster).await {
        say(&error.to_string());
    }
}

async fn print_actions(mut actions: broadcast::Receiver<ChannelAction>) {
    loop {
        match actions.recv().await {
            Ok(action) => {
                if let Some(text) = render_action(&action) {
                    say(&text);
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "output fell behind");
            },
            Err(RecvError::Closed) => break,
        }
    }
}

fn say(text: &str) {
    let mut stdout = std::io::stdout().lock();
    if writeln!(stdout, "{text}").is_err() {
        tracing::debug!("stdout closed");
    }
}
