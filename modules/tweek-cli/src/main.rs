//! Replay captured timeline responses through the interception pipeline.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tweek_common::{ContentId, Settings, SettingsHandle};
use tweek_download::{
    deliver, suggested_filenames, AssetOpener, ContentLocator, DownloadPlan, DownloadPlanner,
    HttpDispatcher, InteractionTracker, RenderedPage,
};
use tweek_pipeline::{Annotations, PageContext};

mod replay;
use replay::{replay, replay_all, CapturedExchange};

const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Parser)]
#[command(name = "tweek")]
#[command(about = "Timeline interception pipeline tools")]
#[command(version)]
struct Cli {
    /// Content type reported for captured responses
    #[arg(long, global = true, default_value = DEFAULT_CONTENT_TYPE)]
    content_type: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one captured response and print the body the page would read
    Replay {
        /// Request URL the response was captured from
        #[arg(long)]
        url: String,

        file: PathBuf,
    },

    /// Replay captured responses and print what the cache learned
    Inspect {
        #[arg(long)]
        url: String,

        files: Vec<PathBuf>,
    },

    /// Replay captured responses and plan a download
    Download {
        #[arg(long)]
        url: String,

        /// Content id to download; located from --page-url when omitted
        #[arg(long)]
        id: Option<String>,

        /// URL of the page the download is requested from
        #[arg(long, default_value = "https://x.com/home")]
        page_url: String,

        /// Download collaborator endpoint; the plan is only printed when omitted
        #[arg(long, env = "TWEEK_DOWNLOAD_ENDPOINT")]
        endpoint: Option<String>,

        files: Vec<PathBuf>,
    },
}

/// Prints asset URLs for the user to open when dispatch fails.
struct PrintOpener;

impl AssetOpener for PrintOpener {
    fn open(&self, url: &str) {
        println!("{url}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("tweek=info".parse()?))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("loading settings")?;
    settings.log_summary();
    let page = PageContext::new(SettingsHandle::new(settings));

    match cli.command {
        Commands::Replay { url, file } => {
            let exchange = CapturedExchange::load(&file, &cli.content_type)?;
            let Some(text) = replay(&page, &url, exchange) else {
                bail!("no response text for {}", file.display());
            };
            println!("{text}");
            Ok(())
        }
        Commands::Inspect { url, files } => {
            replay_all(&page, &url, &files, &cli.content_type)?;
            cmd_inspect(&page)
        }
        Commands::Download {
            url,
            id,
            page_url,
            endpoint,
            files,
        } => {
            replay_all(&page, &url, &files, &cli.content_type)?;
            cmd_download(&page, id, page_url, endpoint).await
        }
    }
}

fn cmd_inspect(page: &PageContext) -> Result<()> {
    let store = page.store();
    let settings = page.settings().current();
    let annotations = Annotations::new(store, &settings);

    let items: Vec<serde_json::Value> = store
        .media_ids()
        .into_iter()
        .filter_map(|id| {
            let cached = store.get(&id)?;
            Some(serde_json::json!({
                "contentId": id,
                "accountHandle": cached.account_handle,
                "media": cached.media,
                "source": annotations.source_label(&id),
                "location": annotations.account_location(&id, &[]),
            }))
        })
        .collect();

    let report = serde_json::json!({ "stats": store.stats(), "items": items });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_download(
    page: &PageContext,
    id: Option<String>,
    page_url: String,
    endpoint: Option<String>,
) -> Result<()> {
    let rendered = RenderedPage {
        url: page_url,
        articles: Vec::new(),
    };

    let id = match id {
        Some(raw) => ContentId::new(raw).context("content id must not be empty")?,
        None => {
            let tracker = InteractionTracker::new();
            ContentLocator::new(page.store(), &tracker)
                .locate(&rendered)
                .map(|located| located.id)
                .context("no content id found; pass --id or a /status/ page URL")?
        }
    };

    let settings = page.settings().current();
    let plan = DownloadPlanner::new(page.store(), &settings).plan(&id, &rendered);

    let request = match plan {
        DownloadPlan::Cached(request) | DownloadPlan::Rendered(request) => request,
        DownloadPlan::NotCaptured { message } => bail!(message),
        DownloadPlan::Disabled => bail!("downloads are disabled (enableDownloads = false)"),
    };

    for name in suggested_filenames(&request) {
        println!("{name}");
    }

    if let Some(endpoint) = endpoint {
        let dispatcher = HttpDispatcher::new(endpoint);
        let delivery = deliver(&request, &dispatcher, &PrintOpener).await;
        tracing::info!(content_id = %id, ?delivery, "Download delivered");
    }
    Ok(())
}
