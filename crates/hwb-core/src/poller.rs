//! The polling loop: fetch → validate → parse → notify → sleep.
//!
//! Every failure inside a cycle is turned into a chat message (subject to the
//! same last-message dedup as status updates) and the loop carries on.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    domain::{ChatId, MessageRef},
    homework::{check_response, parse_status},
    messaging::{port::MessagingPort, types::truncate_for},
    ports::HomeworkApi,
    Error, Result,
};

const FAILURE_PREFIX: &str = "Сбой в работе программы: ";

/// State carried from one cycle to the next. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollState {
    /// `from_date` for the next request (epoch seconds, provider clock).
    pub timestamp: i64,
    /// Last text delivered to the chat.
    pub last_message: Option<String>,
}

impl PollState {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            last_message: None,
        }
    }

    pub fn starting_now() -> Self {
        Self::new(chrono::Utc::now().timestamp())
    }

    fn is_repeat(&self, message: &str) -> bool {
        self.last_message.as_deref() == Some(message)
    }
}

/// What a successful cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent(String),
    Unchanged,
    NoHomework,
}

pub struct Poller {
    api: Arc<dyn HomeworkApi>,
    messenger: Arc<dyn MessagingPort>,
    chat_id: ChatId,
    retry_period: Duration,
}

impl Poller {
    pub fn new(
        api: Arc<dyn HomeworkApi>,
        messenger: Arc<dyn MessagingPort>,
        chat_id: ChatId,
        retry_period: Duration,
    ) -> Self {
        Self {
            api,
            messenger,
            chat_id,
            retry_period,
        }
    }

    pub fn from_config(
        cfg: &Config,
        api: Arc<dyn HomeworkApi>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self::new(api, messenger, cfg.chat_id, cfg.retry_period)
    }

    /// Run cycles until `cancel` fires. Cancellation is observed between cycles.
    pub async fn run(&self, mut state: PollState, cancel: CancellationToken) -> PollState {
        tracing::info!(
            chat_id = self.chat_id.0,
            period_secs = self.retry_period.as_secs(),
            from_date = state.timestamp,
            "polling started"
        );

        loop {
            let _ = self.tick(&mut state).await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.retry_period) => {}
            }
        }

        tracing::info!("polling stopped");
        state
    }

    /// One cycle, including reporting its failure to the chat.
    ///
    /// The returned error has already been logged and (unless it repeats the
    /// last message) reported; callers only need it for inspection.
    pub async fn tick(&self, state: &mut PollState) -> Result<CycleOutcome> {
        let result = self.poll_once(state).await;

        if let Err(err) = &result {
            tracing::error!(error = %err, transient = err.is_transient(), "polling cycle failed");

            let message = format!("{FAILURE_PREFIX}{err}");
            if state.is_repeat(&message) {
                tracing::debug!("failure already reported");
            } else {
                match self.notify(&message).await {
                    Ok(_) => state.last_message = Some(message),
                    // Never re-enter the failure path from here.
                    Err(send_err) => {
                        tracing::error!(error = %send_err, "failed to report cycle failure")
                    }
                }
            }
        }

        result
    }

    /// One cycle without the failure-reporting path.
    pub async fn poll_once(&self, state: &mut PollState) -> Result<CycleOutcome> {
        tracing::debug!(from_date = state.timestamp, "polling review api");
        let response = self.api.fetch_statuses(Some(state.timestamp)).await?;

        let outcome = self.handle_response(&response, state).await;

        // Advance even when the response was rejected further down. A missing
        // response or an undelivered status leaves the timestamp alone so the
        // same homework is listed again next cycle.
        if matches!(outcome, Err(Error::NotificationDeliveryFailure(_))) {
            tracing::debug!(
                from_date = state.timestamp,
                "status not delivered; keeping previous timestamp"
            );
            return outcome;
        }
        match response.get("current_date").and_then(Value::as_i64) {
            Some(current_date) => state.timestamp = current_date,
            None => tracing::warn!(
                from_date = state.timestamp,
                "response has no integer current_date; keeping previous timestamp"
            ),
        }

        outcome
    }

    async fn handle_response(&self, response: &Value, state: &mut PollState) -> Result<CycleOutcome> {
        let homeworks = check_response(response)?;

        // Newest first; older entries in the same batch are not reported.
        let Some(latest) = homeworks.first() else {
            tracing::info!("no homework found");
            return Ok(CycleOutcome::NoHomework);
        };
        if homeworks.len() > 1 {
            tracing::debug!(skipped = homeworks.len() - 1, "reporting newest homework only");
        }

        let message = parse_status(latest)?;
        if state.is_repeat(&message) {
            tracing::debug!("no change in homework status");
            return Ok(CycleOutcome::Unchanged);
        }

        self.notify(&message).await?;
        state.last_message = Some(message.clone());
        Ok(CycleOutcome::Sent(message))
    }

    async fn notify(&self, message: &str) -> Result<MessageRef> {
        let text = truncate_for(self.messenger.capabilities(), message);
        let sent = self
            .messenger
            .send_text(self.chat_id, &text)
            .await
            .map_err(|e| match e {
                e @ Error::NotificationDeliveryFailure(_) => e,
                other => Error::NotificationDeliveryFailure(other.to_string()),
            })?;

        tracing::info!(message_id = sent.message_id.0, "message sent: {message}");
        Ok(sent)
    }
}
