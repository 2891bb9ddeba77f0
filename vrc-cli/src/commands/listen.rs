//! Listen command - follow the real-time event stream.

use std::sync::Arc;

use console::style;
use serde::Serialize;
use tracing::{error, info, warn};

use vrc_core::config::ConfigHandle;
use vrc_core::error::{VrcError, VrcResult};
use vrc_api::ApiClient;
use vrc_models::{CurrentUser, LimitedUser};
use vrc_socket::{ConnectionState, EventType, RawEvent, StreamClient, StreamError, StreamObserver};

use super::LoginArgs;
use crate::OutputFormat;

/// Prints connection state changes and stream errors as they happen.
struct ConsoleObserver {
    format: OutputFormat,
}

impl StreamObserver for ConsoleObserver {
    fn on_state_change(&self, state: ConnectionState) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "state": state.to_string() }));
            }
            OutputFormat::Text => {
                let label = match state {
                    ConnectionState::Connected => style(state.to_string()).green(),
                    ConnectionState::Connecting => style(state.to_string()).yellow(),
                    _ => style(state.to_string()).dim(),
                };
                println!("  {} {label}", style("[state]").bold().dim());
            }
        }
    }

    fn on_error(&self, error: &StreamError) {
        if self.format == OutputFormat::Text {
            println!("  {} {error}", style("WARN").yellow());
        }
    }
}

/// Run the listen command.
pub async fn run(
    config: ConfigHandle,
    login: LoginArgs,
    token: Option<String>,
    raw: bool,
    format: OutputFormat,
) -> VrcResult<()> {
    let api = super::create_api_client(&config).await?;

    match token.filter(|t| !t.trim().is_empty()) {
        Some(t) => {
            api.set_session_token(&t);
            if format == OutputFormat::Text {
                println!("{} Using provided session token.", style("[1/2]").bold().dim());
            }
        }
        None => {
            let user = match resume_saved_session(&api).await {
                Some(user) => user,
                None => {
                    if format == OutputFormat::Text {
                        println!("{} Logging in...", style("[1/2]").bold().dim());
                    }
                    super::authenticate_interactive(&api, login).await?
                }
            };
            if format == OutputFormat::Text {
                println!(
                    "  {} Logged in as {}.",
                    style("OK").green().bold(),
                    style(&user.display_name).bold()
                );
            }
        }
    }

    if format == OutputFormat::Text {
        println!("{} Connecting to the event stream...", style("[2/2]").bold().dim());
    }
    let stream_config = config.read().await.stream.clone();
    let client = StreamClient::builder(stream_config)
        .with_observer(Arc::new(ConsoleObserver { format }))
        .connect(&api)
        .await
        .inspect_err(|e| {
            if e.is_auth_error() {
                error!("the stream did not accept the session; run `vrchat login --save` again");
            }
        })?;

    register_printers(&client, raw, format);
    info!("listening with {} subscriptions", client.subscription_count());

    if format == OutputFormat::Text {
        println!(
            "  {} Connected. Listening for events... (Ctrl+C to stop)",
            style("OK").green().bold()
        );
        println!();
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if format == OutputFormat::Text {
                println!("\n  Disconnecting...");
            }
            client.close().await;
            Ok(())
        }
        _ = client.wait() => {
            error!("event stream stopped; the session may have expired");
            Err(VrcError::Stream("event stream closed; log in again".into()))
        }
    }
}

/// Reuse the session saved by `login --save` if it is still valid.
async fn resume_saved_session(api: &ApiClient) -> Option<CurrentUser> {
    let path = super::session_path().ok()?;
    if !path.exists() {
        return None;
    }
    if let Err(e) = api.load_session(&path) {
        warn!("ignoring saved session: {e}");
        return None;
    }
    match api.current_user().await {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("saved session rejected: {e}");
            None
        }
    }
}

/// Subscribe a printer for every known event plus the wildcard feed.
fn register_printers(client: &StreamClient, raw: bool, format: OutputFormat) {
    client.on_friend_online(move |ev| {
        let name = who(ev.user.as_ref(), &ev.user_id);
        emit(format, "friend-online", format!("{name} is online ({})", ev.platform), &ev);
    });
    client.on_friend_offline(move |ev| {
        emit(format, "friend-offline", format!("{} went offline", ev.user_id), &ev);
    });
    client.on_friend_location(move |ev| {
        let name = who(ev.user.as_ref(), &ev.user_id);
        let place = if !ev.traveling_to_location.is_empty() {
            format!("traveling to {}", ev.traveling_to_location)
        } else if ev.location.is_empty() {
            "private".to_string()
        } else {
            ev.location.clone()
        };
        emit(format, "friend-location", format!("{name} -> {place}"), &ev);
    });
    client.on_friend_active(move |ev| {
        let name = who(ev.user.as_ref(), &ev.user_id);
        emit(format, "friend-active", format!("{name} is active on {}", ev.platform), &ev);
    });
    client.on_friend_add(move |ev| {
        let name = who(ev.user.as_ref(), &ev.user_id);
        emit(format, "friend-add", format!("{name} is now a friend"), &ev);
    });
    client.on_friend_delete(move |ev| {
        emit(format, "friend-delete", format!("{} was removed", ev.user_id), &ev);
    });
    client.on_notification(move |ev| {
        let summary = format!(
            "{} from {}: {}",
            ev.notification_type,
            ev.sender_username,
            super::truncate(&ev.message, 60)
        );
        emit(format, "notification", summary, &ev);
    });
    client.on_notification_v2(move |ev| {
        let summary = format!("{}: {}", ev.notification_type, super::truncate(&ev.title, 60));
        emit(format, "notification-v2", summary, &ev);
    });
    client.on_user_update(move |ev| {
        let name = ev
            .user
            .as_ref()
            .map(|u| u.display_name.clone())
            .unwrap_or_else(|| ev.user_id.clone());
        emit(format, "user-update", format!("profile of {name} changed"), &ev);
    });
    client.on_group_joined(move |ev| {
        let name = ev
            .group
            .as_ref()
            .map(|g| g.name.clone())
            .unwrap_or_else(|| ev.group_id.clone());
        emit(format, "group-joined", format!("joined {name}"), &ev);
    });
    client.on_group_left(move |ev| {
        emit(format, "group-left", format!("left {}", ev.group_id), &ev);
    });
    client.on_group_announcement(move |ev| {
        let summary = match ev.announcement.as_ref() {
            Some(post) => format!("{}: {}", ev.group_id, super::truncate(&post.title, 60)),
            None => format!("{}: new announcement", ev.group_id),
        };
        emit(format, "group-announcement", summary, &ev);
    });

    // Tags without a typed printer are always shown so nothing goes missing.
    client.on_any(move |event: &RawEvent| {
        if raw || matches!(event.kind(), EventType::Unknown(_)) {
            print_raw(format, event);
        }
    });
}

fn who(user: Option<&LimitedUser>, id: &str) -> String {
    user.map(|u| u.label().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| id.to_string())
}

fn emit<T: Serialize>(format: OutputFormat, tag: &str, summary: String, payload: &T) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "type": tag, "payload": payload }));
        }
        OutputFormat::Text => {
            println!(
                "  {} {} {summary}",
                style(chrono::Local::now().format("%H:%M:%S")).dim(),
                style(format!("[{tag}]")).cyan()
            );
        }
    }
}

fn print_raw(format: OutputFormat, event: &RawEvent) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "type": event.event_type, "content": event.content })
            );
        }
        OutputFormat::Text => {
            println!(
                "  {} {} {}",
                style(chrono::Local::now().format("%H:%M:%S")).dim(),
                style(format!("[* {}]", event.event_type)).magenta(),
                super::truncate(&event.content, 120)
            );
        }
    }
}
