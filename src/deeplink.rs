use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use crate::catalog::{Catalog, CatalogItem};
use crate::storage::Store;

pub const DEFAULT_PARAM: &str = "id";
pub const REMEMBERED_ADDRESS_KEY: &str = "movie-shelf:address";

/// Read/write access to one page address. Writes replace the current address;
/// nothing is ever pushed onto a history.
pub trait AddressableState {
    fn get_param(&self, key: &str) -> Option<String>;
    fn set_param(&mut self, key: &str, value: &str);
    fn remove_param(&mut self, key: &str);
    fn href(&self) -> String;
}

impl<T: AddressableState + ?Sized> AddressableState for Box<T> {
    fn get_param(&self, key: &str) -> Option<String> {
        (**self).get_param(key)
    }

    fn set_param(&mut self, key: &str, value: &str) {
        (**self).set_param(key, value)
    }

    fn remove_param(&mut self, key: &str) {
        (**self).remove_param(key)
    }

    fn href(&self) -> String {
        (**self).href()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAddress {
    url: Url,
}

impl PageAddress {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim()).with_context(|| format!("deeplink: parse address {raw}"))?;
        Ok(Self::new(url))
    }

    fn rewrite_query(&mut self, pairs: Vec<(String, String)>) {
        if pairs.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }

    fn pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

impl AddressableState for PageAddress {
    fn get_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn set_param(&mut self, key: &str, value: &str) {
        let mut replaced = false;
        let mut pairs = Vec::new();
        for (k, v) in self.pairs() {
            if k != key {
                pairs.push((k, v));
            } else if !replaced {
                pairs.push((k, value.to_string()));
                replaced = true;
            }
        }
        if !replaced {
            pairs.push((key.to_string(), value.to_string()));
        }
        self.rewrite_query(pairs);
    }

    fn remove_param(&mut self, key: &str) {
        let pairs = self.pairs().into_iter().filter(|(k, _)| k != key).collect();
        self.rewrite_query(pairs);
    }

    fn href(&self) -> String {
        self.url.to_string()
    }
}

/// Page address that writes every change through to the key/value store so the
/// open item survives a restart.
#[derive(Debug, Clone)]
pub struct RememberedAddress {
    page: PageAddress,
    store: Arc<Store>,
}

impl RememberedAddress {
    /// Restores the stored address, falling back to `initial` when nothing
    /// usable was stored.
    pub fn restore(store: Arc<Store>, initial: PageAddress) -> Result<Self> {
        let stored = store
            .get(REMEMBERED_ADDRESS_KEY)?
            .and_then(|raw| PageAddress::parse(&raw).ok());
        Ok(Self {
            page: stored.unwrap_or(initial),
            store,
        })
    }

    /// Uses `page` as-is and persists it immediately.
    pub fn overwrite(store: Arc<Store>, page: PageAddress) -> Result<Self> {
        let remembered = Self { page, store };
        remembered.persist();
        Ok(remembered)
    }

    fn persist(&self) {
        if let Err(err) = self.store.put(REMEMBERED_ADDRESS_KEY, &self.page.href()) {
            tracing::warn!(error = %err, "failed to remember address");
        }
    }
}

impl AddressableState for RememberedAddress {
    fn get_param(&self, key: &str) -> Option<String> {
        self.page.get_param(key)
    }

    fn set_param(&mut self, key: &str, value: &str) {
        self.page.set_param(key, value);
        self.persist();
    }

    fn remove_param(&mut self, key: &str) {
        self.page.remove_param(key);
        self.persist();
    }

    fn href(&self) -> String {
        self.page.href()
    }
}

/// Keeps the open item and the addressable location in step.
#[derive(Debug, Clone)]
pub struct DeepLink<A> {
    address: A,
    param: String,
}

impl<A: AddressableState> DeepLink<A> {
    pub fn new(address: A) -> Self {
        Self::with_param(address, DEFAULT_PARAM)
    }

    pub fn with_param(address: A, param: impl Into<String>) -> Self {
        let param = param.into();
        let param = if param.trim().is_empty() {
            DEFAULT_PARAM.to_string()
        } else {
            param
        };
        Self { address, param }
    }

    pub fn open_item(&mut self, id: &str) {
        self.address.set_param(&self.param, id);
        tracing::debug!(id, address = %self.address.href(), "deep link set");
    }

    pub fn close_item(&mut self) {
        self.address.remove_param(&self.param);
        tracing::debug!(address = %self.address.href(), "deep link cleared");
    }

    pub fn requested_id(&self) -> Option<String> {
        self.address
            .get_param(&self.param)
            .filter(|id| !id.is_empty())
    }

    pub fn resolve_from_location<'c>(&self, catalog: &'c Catalog) -> Option<&'c CatalogItem> {
        let id = self.requested_id()?;
        let found = catalog.find(&id);
        if found.is_none() {
            tracing::debug!(id = %id, "deep link does not match any catalog item");
        }
        found
    }

    pub fn address(&self) -> &A {
        &self.address
    }

    pub fn share_link(&self) -> String {
        self.address.href()
    }
}
