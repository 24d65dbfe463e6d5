use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use crate::catalog::{self, Catalog, LoadOptions};
use crate::config::{self, Config, SourceKind};
use crate::deeplink::{AddressableState, DeepLink, PageAddress, RememberedAddress};
use crate::logging;
use crate::shelf::Shelf;
use crate::source::{CatalogSource, FileSource, LocalSource, RemoteConfig, RemoteSource};
use crate::storage;
use crate::ui;

pub type BoxedAddress = Box<dyn AddressableState + Send>;

/// Where the catalog comes from, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Local,
    Remote(String),
    File(PathBuf),
}

impl SourceSpec {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            SourceSpec::Local
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SourceSpec::Remote(trimmed.to_string())
        } else {
            SourceSpec::File(PathBuf::from(trimmed))
        }
    }

    pub fn apply(self, cfg: &mut Config) {
        match self {
            SourceSpec::Local => cfg.source.kind = SourceKind::Local,
            SourceSpec::Remote(url) => {
                cfg.source.kind = SourceKind::Remote;
                cfg.source.url = url;
            }
            SourceSpec::File(path) => {
                cfg.source.kind = SourceKind::File;
                cfg.source.path = path;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub source: Option<String>,
    pub address: Option<String>,
}

pub fn load_config(opts: &RunOptions) -> Result<Config> {
    let mut cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if let Some(raw) = opts.source.as_deref() {
        SourceSpec::parse(raw).apply(&mut cfg);
    }
    Ok(cfg)
}

pub fn open_store(cfg: &Config) -> Result<Arc<storage::Store>> {
    let store = storage::Store::open(storage::Options {
        path: cfg.source.store_path.clone(),
    })
    .context("open storage")?;
    Ok(Arc::new(store))
}

pub fn build_source(
    cfg: &Config,
    store: Option<Arc<storage::Store>>,
) -> Result<Arc<dyn CatalogSource>> {
    let source: Arc<dyn CatalogSource> = match cfg.source.kind {
        SourceKind::File => Arc::new(FileSource::new(cfg.source.path.clone())),
        SourceKind::Remote => {
            let url = Url::parse(cfg.source.url.trim())
                .with_context(|| format!("source: invalid catalog url {:?}", cfg.source.url))?;
            Arc::new(
                RemoteSource::new(
                    url,
                    RemoteConfig {
                        user_agent: cfg.source.user_agent.clone(),
                        timeout: cfg.source.request_timeout,
                        http_client: None,
                    },
                )
                .context("source: build http client")?,
            )
        }
        SourceKind::Local => {
            let store = match store {
                Some(store) => store,
                None => open_store(cfg)?,
            };
            Arc::new(LocalSource::new(store))
        }
    };
    Ok(source)
}

pub fn load_options(cfg: &Config) -> LoadOptions {
    LoadOptions::with_policy(cfg.catalog.missing_added_at)
}

pub fn load_catalog(cfg: &Config) -> Result<Catalog> {
    let source = build_source(cfg, None)?;
    let catalog = catalog::load(source.as_ref(), &load_options(cfg))?;
    Ok(catalog)
}

/// Address the shell starts from: an explicit address wins, then the
/// remembered one, then the configured base.
pub fn initial_address(
    cfg: &Config,
    explicit: Option<&str>,
    store: Option<Arc<storage::Store>>,
) -> Result<BoxedAddress> {
    let base = PageAddress::parse(&cfg.deep_link.base_address)
        .context("deep_link: invalid base address")?;
    let explicit = explicit
        .map(PageAddress::parse)
        .transpose()
        .context("deep_link: invalid --address")?;

    let address: BoxedAddress = match (store, explicit) {
        (Some(store), Some(page)) => Box::new(RememberedAddress::overwrite(store, page)?),
        (Some(store), None) => Box::new(RememberedAddress::restore(store, base)?),
        (None, Some(page)) => Box::new(page),
        (None, None) => Box::new(base),
    };
    Ok(address)
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = load_config(&opts)?;
    let _log_guard = logging::init(&cfg.log, logging::Target::File)?;
    tracing::info!(version = crate::VERSION, "starting shell");

    let needs_store = cfg.deep_link.remember || cfg.source.kind == SourceKind::Local;
    let store = if needs_store {
        Some(open_store(&cfg)?)
    } else {
        None
    };
    let source = build_source(&cfg, store.clone())?;
    let remember_store = if cfg.deep_link.remember { store } else { None };
    let address = initial_address(&cfg, opts.address.as_deref(), remember_store)?;
    let shelf = Shelf::new(
        DeepLink::with_param(address, cfg.deep_link.param.clone()),
        cfg.ui.default_sort,
    );

    let options = ui::Options {
        shelf,
        source,
        load_options: load_options(&cfg),
        player: cfg.player.clone(),
        placeholder_poster: cfg.ui.placeholder_poster.clone(),
    };

    let mut model = ui::Model::new(options);
    model.run()?;
    tracing::info!(share_link = %model.share_link(), "shell closed");
    Ok(())
}
