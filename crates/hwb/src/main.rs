use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use hwb_core::{
    config::Config,
    poller::{PollState, Poller},
};
use hwb_practicum::PracticumClient;
use hwb_telegram::TelegramMessenger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    hwb_core::logging::init("hwb")?;

    let cfg = Config::load().map_err(|e| {
        tracing::error!(error = %e, "missing or invalid configuration, exiting");
        e
    })?;
    tracing::debug!(config = ?cfg, "configuration loaded");

    let api = Arc::new(PracticumClient::from_config(&cfg)?);
    let messenger = Arc::new(TelegramMessenger::from_token(cfg.telegram_token.clone()));
    let poller = Poller::from_config(&cfg, api, messenger);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, stopping after the current cycle");
            on_signal.cancel();
        }
    });

    poller.run(PollState::starting_now(), cancel).await;
    Ok(())
}
