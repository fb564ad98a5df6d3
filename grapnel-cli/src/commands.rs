//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use futures::StreamExt;
use grapnel_core::catalog::{Credential, YtDlpCatalog};
use grapnel_core::download::{
    DeliveryBody, DownloadMode, DownloadRequest, DownloadService, FfmpegMuxer,
};
use grapnel_core::fetch::HttpStreamFetcher;
use grapnel_core::{GrapnelConfig, GrapnelError, Result};
use tokio::io::AsyncWriteExt;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Address to bind to, e.g. 127.0.0.1:3000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print metadata and the advertised format list for a video
    Probe {
        /// Video URL or identifier
        url: String,
        /// Opaque credential token forwarded to the origin
        #[arg(long)]
        credential: Option<String>,
    },
    /// Download a video to a local file
    Fetch {
        /// Video URL or identifier
        url: String,
        /// Output format: mp4, mp3, or video-only
        #[arg(long, default_value = "mp4")]
        format: String,
        /// Pin selection to one exact format id
        #[arg(long)]
        itag: Option<String>,
        /// Fetch video and audio separately and remux locally
        #[arg(long)]
        combine: bool,
        /// Output file path (defaults to the attachment filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Opaque credential token forwarded to the origin
        #[arg(long)]
        credential: Option<String>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Serve { bind } => serve(bind).await,
        Commands::Probe { url, credential } => probe(url, credential).await,
        Commands::Fetch {
            url,
            format,
            itag,
            combine,
            output,
            credential,
        } => fetch(url, format, itag, combine, output, credential).await,
    }
}

fn production_service(config: GrapnelConfig) -> Result<DownloadService> {
    let catalog = Arc::new(YtDlpCatalog::new(&config.catalog));
    let fetcher = Arc::new(HttpStreamFetcher::new(&config.fetch)?);
    let muxer = Arc::new(FfmpegMuxer::new(&config.remux));
    Ok(DownloadService::new(catalog, fetcher, muxer, config))
}

async fn serve(bind: Option<String>) -> Result<()> {
    let mut config = GrapnelConfig::from_env();
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    grapnel_web::run_server(config)
        .await
        .map_err(|e| GrapnelError::Configuration {
            reason: format!("server failed: {e}"),
        })
}

async fn probe(url: String, credential: Option<String>) -> Result<()> {
    let service = production_service(GrapnelConfig::from_env())?;
    let credential = credential.map(Credential::new);

    let info = service.metadata(&url, credential.as_ref()).await?;
    let rendered =
        serde_json::to_string_pretty(&info).map_err(|e| GrapnelError::Configuration {
            reason: format!("failed to render metadata: {e}"),
        })?;
    println!("{rendered}");
    Ok(())
}

async fn fetch(
    url: String,
    format: String,
    itag: Option<String>,
    combine: bool,
    output: Option<PathBuf>,
    credential: Option<String>,
) -> Result<()> {
    let Some(mode) = DownloadMode::parse_label(&format) else {
        return Err(GrapnelError::Configuration {
            reason: format!("unsupported format {format:?}; expected mp4, mp3, or video-only"),
        });
    };

    let service = production_service(GrapnelConfig::from_env())?;
    let request = DownloadRequest {
        resource_id: url,
        mode,
        explicit_format_id: itag,
        combine: mode == DownloadMode::MuxedVideo && combine,
        credential: credential.map(Credential::new),
    };

    let delivery = service.download(&request).await?;
    let path = output.unwrap_or_else(|| PathBuf::from(&delivery.file_name));

    match delivery.body {
        DeliveryBody::Buffered(bytes) => {
            tokio::fs::write(&path, &bytes).await?;
        }
        DeliveryBody::Streamed(mut stream) => {
            let mut file = tokio::fs::File::create(&path).await?;
            while let Some(chunk) = stream.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
        }
    }

    println!("Saved {}", path.display());
    Ok(())
}
