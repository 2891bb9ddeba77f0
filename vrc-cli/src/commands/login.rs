//! Login command - authenticate and show the current user.

use console::style;

use vrc_core::config::ConfigHandle;
use vrc_core::error::VrcResult;
use vrc_models::CurrentUser;

use super::LoginArgs;
use crate::OutputFormat;

/// Run the login command.
pub async fn run(
    config: ConfigHandle,
    args: LoginArgs,
    save: bool,
    print_token: bool,
    format: OutputFormat,
) -> VrcResult<()> {
    let api = super::create_api_client(&config).await?;
    let user = super::authenticate_interactive(&api, args).await?;
    let saved_to = if save {
        let path = super::session_path()?;
        api.save_session(&path)?;
        Some(path)
    } else {
        None
    };
    let token = if print_token {
        Some(api.session_token()?)
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_value(&user)?;
            if let (Some(t), Some(obj)) = (&token, out.as_object_mut()) {
                obj.insert("sessionToken".into(), serde_json::Value::String(t.clone()));
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            print_user(&user);
            if let Some(t) = token {
                println!("  Token:     {t}");
            }
            if let Some(path) = saved_to {
                println!("  {} Session saved to {}", style("OK").green(), path.display());
            }
        }
    }
    Ok(())
}

fn print_user(user: &CurrentUser) {
    println!(
        "{} Logged in as {}",
        style("OK").green().bold(),
        style(&user.display_name).bold()
    );
    println!("  ID:        {}", user.id);
    if !user.status.is_empty() {
        let status = if user.status_description.is_empty() {
            user.status.clone()
        } else {
            format!("{} ({})", user.status, super::truncate(&user.status_description, 40))
        };
        println!("  Status:    {status}");
    }
    println!(
        "  Friends:   {} ({} online, {} active)",
        user.friends.len(),
        user.online_friends.len(),
        user.active_friends.len()
    );
    if !user.last_platform.is_empty() {
        println!("  Platform:  {}", user.last_platform);
    }
}
