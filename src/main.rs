use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use propfeed::application::ListingCacheService;
use propfeed::domain::entities::{
    CacheKey, FreshnessTag, ImageLocation, ImageSource, Listing, ResolvedImage,
};
use propfeed::domain::services::normalize_one;
use propfeed::infrastructure::{
    AppConfig, BackgroundPreloader, CliArgs, Command, DiskImageCache, FileKeyValueStore,
    HttpImageFetcher, HttpListingSource, ImageCache, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

struct Runtime {
    listings: ListingCacheService,
    images: Arc<ImageCache>,
    preloader: Arc<BackgroundPreloader>,
}

async fn build_runtime(config: &AppConfig) -> Result<Runtime> {
    let data_dir = config
        .effective_data_dir()
        .ok_or_else(|| eyre!("no data directory available, set cache.data_dir"))?;
    let image_dir = config
        .effective_image_dir()
        .ok_or_else(|| eyre!("no cache directory available, set cache.cache_dir"))?;

    let store = Arc::new(FileKeyValueStore::in_dir(&data_dir).await?);
    let disk = Arc::new(DiskImageCache::new(image_dir, config.disk_cache_bytes()).await?);
    let fetcher = Arc::new(HttpImageFetcher::new(config.api.timeout_secs)?);

    let images = Arc::new(
        ImageCache::new(disk, store.clone(), fetcher, config.cache.memory_index_size)
            .with_retry(config.retry_policy()),
    );
    let preloader = Arc::new(BackgroundPreloader::new(
        images.clone(),
        config.cache.max_concurrent_preloads,
    ));

    let source = Arc::new(HttpListingSource::with_endpoint(
        &config.api.base_url,
        &config.api.listings_path,
        config.api.timeout_secs,
    )?);

    let listings = ListingCacheService::new(store, source, preloader.clone())
        .with_ttl(config.snapshot_ttl())
        .with_fields(config.fields.clone());

    Ok(Runtime {
        listings,
        images,
        preloader,
    })
}

fn describe(listing: &Listing) -> String {
    ["title", "name", "id"]
        .iter()
        .find_map(|field| match listing.field(field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| "(untitled)".to_string())
}

async fn run_feed(runtime: &Runtime, json: bool) -> Result<()> {
    let categorized = runtime.listings.get_categorized().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&categorized)?);
    } else {
        for tag in FreshnessTag::ALL {
            let bucket = categorized.bucket(tag);
            println!("{tag} ({})", bucket.len());
            for listing in bucket {
                println!("  - {}", describe(listing));
            }
        }
    }

    let report = runtime.preloader.flush().await;
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "Image preloads finished"
    );
    Ok(())
}

async fn run_resolve(runtime: &Runtime, raw_url: &str, key: Option<String>) -> Result<()> {
    let url = normalize_one(raw_url).ok_or_else(|| eyre!("not a usable image URL: {raw_url}"))?;
    let key = key.map(CacheKey::new);

    match runtime
        .images
        .resolve(&ImageSource::Remote(url), key.as_ref())
        .await
    {
        ResolvedImage::Loaded(ImageLocation::Local(path)) => println!("{}", path.display()),
        ResolvedImage::Loaded(ImageLocation::Remote { url, bytes }) => {
            println!("{url} ({} bytes, not cached)", bytes.len());
        }
        ResolvedImage::Loaded(ImageLocation::Bundled(asset)) => println!("bundled:{asset}"),
        ResolvedImage::Errored { attempts, reason } => {
            return Err(eyre!("failed after {attempts} attempts: {reason}"));
        }
    }
    Ok(())
}

async fn run_clear(runtime: &Runtime) -> Result<()> {
    runtime.listings.clear().await?;
    runtime.images.clear().await?;
    println!("Cleared listing snapshot and image cache");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = propfeed::VERSION, "Starting {}", propfeed::NAME);

    let runtime = build_runtime(&config).await?;

    match args.command {
        Command::Feed { json } => run_feed(&runtime, json).await,
        Command::Resolve { url, key } => run_resolve(&runtime, &url, key).await,
        Command::Clear => run_clear(&runtime).await,
    }
}
