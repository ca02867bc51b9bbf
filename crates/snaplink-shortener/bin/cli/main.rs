mod cli;

use crate::cli::{CacheBackendArg, Command, LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use snaplink_cache::{MokaCacheConfig, MokaUrlCache, RedisUrlCache, UrlCache};
use snaplink_core::{Repository, ShortCode, Shortener};
use snaplink_shortener::{ShortenerService, ShortenerSettings};
use snaplink_snowflake::{Snowflake, SnowflakeSettings};
use snaplink_storage::{InMemoryRepository, MySqlRepository};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        machine_id = config.machine_id,
        epoch = %config.epoch,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        "starting snaplink"
    );

    match config.storage {
        StorageBackendArg::InMemory => with_cache(&config, InMemoryRepository::new()).await,
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            repository
                .ensure_schema()
                .await
                .context("failed to create schema")?;
            with_cache(&config, repository).await
        }
    }
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn with_cache<R: Repository>(config: &CLI, repository: R) -> anyhow::Result<()> {
    match config.cache {
        CacheBackendArg::Moka => {
            let cache = MokaUrlCache::from(
                MokaCacheConfig::builder()
                    .max_capacity(config.cache_capacity)
                    .build(),
            );
            run(config, repository, cache).await
        }
        CacheBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("redis url is required when cache backend is redis")?;
            let cache = RedisUrlCache::connect(redis_url, config.redis_key_prefix.as_str())
                .await
                .context("failed to connect to redis")?;
            run(config, repository, cache).await
        }
    }
}

async fn run<R: Repository, C: UrlCache>(
    config: &CLI,
    repository: R,
    cache: C,
) -> anyhow::Result<()> {
    let generator = Snowflake::new(
        SnowflakeSettings::builder()
            .machine_id(config.machine_id)
            .start_epoch(config.epoch)
            .build(),
    )
    .context("invalid id generator configuration")?;

    let mut settings = ShortenerSettings::builder()
        .cache_ttl(Duration::from_secs(config.cache_ttl_secs))
        .build();
    settings.operation_timeout = config.operation_timeout_ms.map(Duration::from_millis);

    let service = ShortenerService::with_settings(repository, cache, generator, settings);

    match &config.command {
        Command::Shorten { urls } => {
            for url in urls {
                let shortened = service
                    .create(url)
                    .await
                    .with_context(|| format!("failed to shorten {url}"))?;
                let status = if shortened.is_new() { "created" } else { "existing" };
                println!("{}\t{}\t{}", shortened.link.short_code, status, url);
            }
        }
        Command::Resolve { codes } => {
            for code in codes {
                let code = ShortCode::new(code)?;
                let long_url = service
                    .resolve(&code)
                    .await
                    .with_context(|| format!("failed to resolve {code}"))?;
                println!("{code}\t{long_url}");
            }
        }
        Command::Delete { codes } => {
            for code in codes {
                let code = ShortCode::new(code)?;
                service
                    .delete(&code)
                    .await
                    .with_context(|| format!("failed to delete {code}"))?;
                println!("{code}\tdeleted");
            }
        }
        Command::Count => {
            println!("{}", service.count().await?);
        }
    }

    Ok(())
}
