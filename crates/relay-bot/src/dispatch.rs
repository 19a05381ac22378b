//! Long-poll update loop and routing.

use std::sync::Arc;
use std::time::Duration;

use relay_telegram::{BotApi, TransportError, Update};

use crate::commands;
use crate::handler::{InboundText, Relay, RelayError};

/// Server-side long-poll window for getUpdates.
const POLL_TIMEOUT_SECS: u64 = 50;

/// Pause after a transient polling failure before asking again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

impl Relay {
    /// Route one inbound message: recognized commands go to the admin
    /// handlers, everything else is conversation traffic. Command-shaped
    /// text that matches no known command is dropped.
    pub async fn dispatch(&self, inbound: InboundText) -> Result<(), RelayError> {
        if inbound.text.starts_with('/') {
            match commands::parse(&inbound.text) {
                Some(command) => self.handle_command(command, &inbound).await,
                None => Ok(()),
            }
        } else {
            self.handle_text(inbound).await
        }
    }
}

/// Poll for updates until a fatal transport error. Each update is handled on
/// its own task; per-chat serialization happens inside the handler.
pub async fn run_dispatcher(relay: Arc<Relay>, api: Arc<BotApi>) -> Result<(), TransportError> {
    let mut offset = None;
    log::info!("update loop started");

    loop {
        let updates = match api.get_updates(offset, POLL_TIMEOUT_SECS).await {
            Ok(updates) => updates,
            Err(error) if error.is_transient() => {
                log::warn!("getUpdates failed ({error}), retrying");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
            Err(error) => return Err(error),
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(inbound) = inbound_from_update(update) else {
                continue;
            };
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                if let Err(error) = relay.dispatch(inbound).await {
                    log::error!("update handling failed: {error}");
                }
            });
        }
    }
}

/// Lift a text message out of the update envelope. Non-text updates and
/// messages from other bots yield `None`.
fn inbound_from_update(update: Update) -> Option<InboundText> {
    let message = update.message?;
    let text = message.text?;
    let sender = message.from?;
    if sender.is_bot {
        return None;
    }
    let reply_to = message.reply_to_message.as_ref().and_then(|parent| {
        parent
            .from
            .as_ref()
            .map(|author| (author.id, parent.message_id))
    });
    Some(InboundText {
        chat_id: message.chat.id,
        sender_id: sender.id,
        message_id: message.message_id,
        text,
        reply_to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{ChatId, MessageId, UserId};
    use relay_telegram::{Chat, IncomingMessage, User};

    fn user(id: i64, is_bot: bool) -> User {
        User {
            id: UserId(id),
            is_bot,
            username: None,
        }
    }

    fn text_update(text: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(IncomingMessage {
                message_id: MessageId(12),
                from: Some(user(5, false)),
                chat: Chat { id: ChatId(-100) },
                text: Some(text.to_string()),
                reply_to_message: None,
            }),
        }
    }

    #[test]
    fn lifts_text_and_reply_target() {
        let mut update = text_update("follow-up");
        update.message.as_mut().unwrap().reply_to_message = Some(Box::new(IncomingMessage {
            message_id: MessageId(11),
            from: Some(user(999, true)),
            chat: Chat { id: ChatId(-100) },
            text: Some("previous".to_string()),
            reply_to_message: None,
        }));

        let inbound = inbound_from_update(update).unwrap();

        assert_eq!(inbound.chat_id, ChatId(-100));
        assert_eq!(inbound.sender_id, UserId(5));
        assert_eq!(inbound.message_id, MessageId(12));
        assert_eq!(inbound.reply_to, Some((UserId(999), MessageId(11))));
    }

    #[test]
    fn skips_non_text_and_bot_messages() {
        let mut no_text = text_update("x");
        no_text.message.as_mut().unwrap().text = None;
        assert!(inbound_from_update(no_text).is_none());

        let mut from_bot = text_update("x");
        from_bot.message.as_mut().unwrap().from = Some(user(999, true));
        assert!(inbound_from_update(from_bot).is_none());

        let empty = Update {
            update_id: 1,
            message: None,
        };
        assert!(inbound_from_update(empty).is_none());
    }
}
