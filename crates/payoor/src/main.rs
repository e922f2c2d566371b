use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use payoor_core::{config::Config, model::client::CompletionClient};
use payoor_openai::OpenAiClient;

#[tokio::main]
async fn main() -> Result<(), payoor_core::Error> {
    // `.env` may carry RUST_LOG, so it is read before the subscriber exists.
    payoor_core::config::load_dotenv();
    payoor_core::logging::init("payoor")?;

    info!("starting bot...");
    let cfg = Arc::new(Config::load()?);

    let openai = OpenAiClient::from_config(&cfg)?;
    info!(model = openai.model(), base_url = %cfg.openai_base_url, "completion client ready");
    let client: Arc<dyn CompletionClient> = Arc::new(openai);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("ctrl-c received");
                    shutdown.cancel();
                }
                // Keep running; the process can still be killed externally.
                Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
            }
        });
    }

    payoor_telegram::router::run_polling(cfg, client, shutdown)
        .await
        .map_err(|e| payoor_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
