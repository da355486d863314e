//! Telegram adapter (teloxide).
//!
//! Implements the `hwb-core` MessagingPort over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

use hwb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// Telegram rejects messages longer than this many characters.
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Bot::new(token))
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::NotificationDeliveryFailure(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!(retry_after = ?d, "telegram flood control, retrying");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn messenger() -> TelegramMessenger {
        TelegramMessenger::from_token("123456:test-token")
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_is_honoured_once() {
        let calls = AtomicUsize::new(0);

        let res = messenger()
            .with_retry(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(teloxide::RequestError::RetryAfter(Duration::from_secs(3)))
                    } else {
                        Ok::<u32, teloxide::RequestError>(7)
                    }
                }
            })
            .await;

        assert_eq!(res.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_retry_after_is_a_delivery_failure() {
        let calls = AtomicUsize::new(0);

        let res = messenger()
            .with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<u32, _>(teloxide::RequestError::RetryAfter(Duration::from_secs(3)))
                }
            })
            .await;

        assert!(matches!(res, Err(Error::NotificationDeliveryFailure(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn chat_ids_map_one_to_one() {
        assert_eq!(TelegramMessenger::tg_chat(ChatId(-100_42)).0, -100_42);
    }

    #[test]
    fn request_errors_become_delivery_failures() {
        let err = TelegramMessenger::map_err(teloxide::RequestError::Api(
            teloxide::ApiError::BotBlocked,
        ));
        assert!(
            matches!(err, Error::NotificationDeliveryFailure(msg) if msg.starts_with("telegram error"))
        );
    }
}
