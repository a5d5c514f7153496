//! Chat-command dispatch. Polls the configured command channel for new
//! messages and routes `!track` / `!list` / `!untrack` to the
//! supervisor, posting its reply back into the same channel.

use crate::discord::DiscordClient;
use crate::supervisor::Supervisor;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Track(String),
    List,
    Untrack(String),
}

/// Parse a chat message into a command. Anything that is not a known
/// `!` command is ignored, not an error.
pub fn parse(content: &str) -> Option<Command> {
    let mut words = content.split_whitespace();
    let keyword = words.next()?;
    let arg = words.next();

    match keyword.to_ascii_lowercase().as_str() {
        "!track" => arg.map(|name| Command::Track(name.to_string())),
        "!untrack" => arg.map(|name| Command::Untrack(name.to_string())),
        "!list" => Some(Command::List),
        _ => None,
    }
}

async fn dispatch(supervisor: &Supervisor, command: Command, channel_id: &str) -> Option<String> {
    match command {
        Command::Track(name) => supervisor.handle_track(&name, channel_id).await,
        Command::List => Some(supervisor.handle_list().await),
        Command::Untrack(name) => Some(supervisor.handle_untrack(&name).await),
    }
}

/// Runs forever. Poll failures are logged and retried on the next tick;
/// nothing a handler does can take the loop down.
pub async fn run(
    discord: Arc<DiscordClient>,
    supervisor: Arc<Supervisor>,
    channel_id: String,
    poll_interval: Duration,
) {
    // Start from the current tail of the channel so old history is not
    // replayed as commands after a restart.
    let mut last_seen = match discord.latest_message_id(&channel_id).await {
        Ok(id) => id,
        Err(e) => {
            warn!("Could not read command channel tail: {}", e);
            None
        }
    };

    info!("Watching channel {} for commands", channel_id);
    loop {
        match discord.recent_messages(&channel_id, last_seen.as_deref()).await {
            Ok(mut messages) => {
                // Discord returns newest first; process in arrival order.
                messages.sort_by_key(|m| m.id.parse::<u64>().unwrap_or(0));
                for message in messages {
                    last_seen = Some(message.id.clone());
                    if message.author.bot {
                        continue;
                    }
                    let Some(command) = parse(&message.content) else {
                        continue;
                    };
                    info!("Command from channel {}: {:?}", channel_id, command);
                    if let Some(reply) = dispatch(&supervisor, command, &channel_id).await {
                        if let Err(e) = discord.post_text(&channel_id, &reply).await {
                            warn!("Failed to post command reply: {}", e);
                        }
                    }
                }
            }
            Err(e) => warn!("Command poll failed: {}", e),
        }

        tokio::time::sleep(poll_interval).await;
    }
}
