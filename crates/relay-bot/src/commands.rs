//! Admin commands: whitelist management and the liveness probe.

use crate::guards::{self, GuardVerdict};
use crate::handler::{InboundText, Relay, RelayError};
use crate::notices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    AddWhitelist,
    DelWhitelist,
    GetWhitelist,
}

/// Parse a command out of message text. Returns `None` for anything that is
/// not a recognized command, including other bots' commands addressed as
/// `/name@other_bot`.
pub fn parse(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?.split('@').next()?;
    match name {
        "ping" => Some(Command::Ping),
        "add_whitelist" => Some(Command::AddWhitelist),
        "del_whitelist" => Some(Command::DelWhitelist),
        "get_whitelist" => Some(Command::GetWhitelist),
        _ => None,
    }
}

impl Relay {
    pub async fn handle_command(
        &self,
        command: Command,
        inbound: &InboundText,
    ) -> Result<(), RelayError> {
        let chat_id = inbound.chat_id;
        let sender_id = inbound.sender_id;
        log::info!("command {command:?}: chat={chat_id}, sender={sender_id}");

        match command {
            Command::Ping => {
                let whitelisted = self.store.is_authorized(chat_id).await?;
                self.notify(
                    chat_id,
                    &format!(
                        "chat_id={chat_id} user_id={sender_id} is_whitelisted={whitelisted}"
                    ),
                )
                .await?;
            }
            Command::AddWhitelist => {
                if self.deny(chat_id, guards::admin(sender_id, self.admin_id)).await? {
                    return Ok(());
                }
                if self.store.is_authorized(chat_id).await? {
                    self.notify(chat_id, notices::ALREADY_WHITELISTED).await?;
                } else {
                    self.store.authorize(chat_id).await?;
                    self.notify(chat_id, notices::WHITELIST_ADDED).await?;
                }
            }
            Command::DelWhitelist => {
                if self.deny(chat_id, guards::admin(sender_id, self.admin_id)).await? {
                    return Ok(());
                }
                if !self.store.is_authorized(chat_id).await? {
                    self.notify(chat_id, notices::NOT_IN_WHITELIST).await?;
                } else {
                    self.store.revoke(chat_id).await?;
                    self.notify(chat_id, notices::WHITELIST_REMOVED).await?;
                }
            }
            Command::GetWhitelist => {
                if self.deny(chat_id, guards::admin(sender_id, self.admin_id)).await? {
                    return Ok(());
                }
                if self.deny(chat_id, guards::private(chat_id, sender_id)).await? {
                    return Ok(());
                }
                let chats = self.store.authorized_chats().await?;
                let listing = chats
                    .iter()
                    .map(|chat| chat.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.notify(chat_id, &format!("Whitelist: [{listing}]")).await?;
            }
        }
        Ok(())
    }

    /// Apply one guard verdict; returns true when the command must stop.
    async fn deny(
        &self,
        chat_id: relay_core::ChatId,
        verdict: GuardVerdict,
    ) -> Result<bool, RelayError> {
        match verdict {
            GuardVerdict::Allow => Ok(false),
            GuardVerdict::Deny { notice } => {
                if let Some(notice) = notice {
                    self.notify(chat_id, &notice).await?;
                }
                Ok(true)
            }
        }
    }
}
