use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::config::IngestConfig;
use crate::server::FileServer;

use super::run::cancel_on_ctrl_c;

pub async fn serve(cfg: &IngestConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let server = FileServer::from_config(cfg)?.spawn(cancel.clone()).await?;
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        addr = %server.local_addr(),
        "Serving data directory, press Ctrl+C to stop"
    );
    cancel.cancelled().await;
    server.shutdown().await
}
