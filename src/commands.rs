//! Admin chat commands that manage a guild's subscription.
//!
//! Transport-agnostic: a gateway integration turns each incoming chat message
//! into an [`IncomingMessage`] and posts back whatever reply is returned.

use anyhow::Result;

use crate::registry::DestinationRegistry;

pub const DEFAULT_COMMAND_NAME: &str = "sheapgamer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub content: String,
    pub author_is_bot: bool,
    pub author_is_admin: bool,
}

/// `!subscribe_<name>` / `!unsubscribe_<name>`, exact match after trimming.
pub fn parse_command(content: &str, command_name: &str) -> Option<AdminCommand> {
    let rest = content.trim().strip_prefix('!')?;
    if let Some(name) = rest.strip_prefix("subscribe_") {
        return (name == command_name).then_some(AdminCommand::Subscribe);
    }
    if let Some(name) = rest.strip_prefix("unsubscribe_") {
        return (name == command_name).then_some(AdminCommand::Unsubscribe);
    }
    None
}

/// Apply an admin command to the registry and return the reply text.
///
/// `Ok(None)` means the message is not for us (bot author, non-admin, DM, or
/// not a command) and nothing should be posted.
pub fn handle_message(
    registry: &DestinationRegistry,
    msg: &IncomingMessage,
    command_name: &str,
) -> Result<Option<String>> {
    if msg.author_is_bot || !msg.author_is_admin {
        return Ok(None);
    }
    let Some(guild_id) = msg.guild_id.as_deref() else {
        return Ok(None);
    };
    let Some(cmd) = parse_command(&msg.content, command_name) else {
        return Ok(None);
    };

    let reply = match cmd {
        AdminCommand::Subscribe => {
            registry.register(guild_id, &msg.channel_id)?;
            format!(
                "✅ News channel set. New posts will be published in <#{}>.",
                msg.channel_id
            )
        }
        AdminCommand::Unsubscribe => {
            if registry.unregister(guild_id)? {
                "✅ This server's news channel has been removed.".to_string()
            } else {
                "ℹ️ No news channel is set for this server yet.".to_string()
            }
        }
    };
    Ok(Some(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> IncomingMessage {
        IncomingMessage {
            guild_id: Some("guild-1".into()),
            channel_id: "channel-A".into(),
            content: content.into(),
            author_is_bot: false,
            author_is_admin: true,
        }
    }

    fn registry() -> (tempfile::TempDir, DestinationRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let reg = DestinationRegistry::open(dir.path().join("channels.json"));
        (dir, reg)
    }

    #[test]
    fn parses_known_commands_only() {
        assert_eq!(
            parse_command("!subscribe_news", "news"),
            Some(AdminCommand::Subscribe)
        );
        assert_eq!(
            parse_command("  !unsubscribe_news \n", "news"),
            Some(AdminCommand::Unsubscribe)
        );
        assert_eq!(parse_command("!subscribe_other", "news"), None);
        assert_eq!(parse_command("subscribe_news", "news"), None);
        assert_eq!(parse_command("!subscribe_news please", "news"), None);
    }

    #[test]
    fn subscribe_registers_current_channel() {
        let (_d, reg) = registry();
        let reply = handle_message(&reg, &msg("!subscribe_sheapgamer"), DEFAULT_COMMAND_NAME)
            .unwrap()
            .unwrap();
        assert!(reply.contains("<#channel-A>"));
        assert_eq!(reg.get("guild-1").as_deref(), Some("channel-A"));
    }

    #[test]
    fn unsubscribe_reports_missing_subscription() {
        let (_d, reg) = registry();
        let first = handle_message(&reg, &msg("!unsubscribe_sheapgamer"), DEFAULT_COMMAND_NAME)
            .unwrap()
            .unwrap();
        assert!(first.contains("No news channel"));

        reg.register("guild-1", "channel-A").unwrap();
        let second = handle_message(&reg, &msg("!unsubscribe_sheapgamer"), DEFAULT_COMMAND_NAME)
            .unwrap()
            .unwrap();
        assert!(second.contains("removed"));
        assert!(reg.is_empty());
    }

    #[test]
    fn ignores_bots_non_admins_and_dms() {
        let (_d, reg) = registry();

        let mut bot = msg("!subscribe_sheapgamer");
        bot.author_is_bot = true;
        let mut member = msg("!subscribe_sheapgamer");
        member.author_is_admin = false;
        let mut dm = msg("!subscribe_sheapgamer");
        dm.guild_id = None;

        for m in [bot, member, dm] {
            assert_eq!(handle_message(&reg, &m, DEFAULT_COMMAND_NAME).unwrap(), None);
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn plain_chat_is_ignored() {
        let (_d, reg) = registry();
        assert_eq!(
            handle_message(&reg, &msg("hello there"), DEFAULT_COMMAND_NAME).unwrap(),
            None
        );
    }
}
