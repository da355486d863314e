use async_trait::async_trait;

use crate::{domain::ChatId, domain::MessageRef, messaging::types::MessagingCapabilities, Result};

/// Outbound messenger port.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Deliver plain UTF-8 text to one chat.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
