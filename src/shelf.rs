use crate::catalog::{Catalog, CatalogItem};
use crate::deeplink::{AddressableState, DeepLink};
use crate::view::{self, SortMode, ViewState};

/// Single owner of the catalog, the query state and the derived view.
pub struct Shelf<A> {
    catalog: Catalog,
    view: ViewState,
    visible: Vec<usize>,
    link: DeepLink<A>,
}

impl<A: AddressableState> Shelf<A> {
    pub fn new(link: DeepLink<A>, sort_mode: SortMode) -> Self {
        Self {
            catalog: Catalog::default(),
            view: ViewState {
                sort_mode,
                ..ViewState::default()
            },
            visible: Vec::new(),
            link,
        }
    }

    fn rederive(&mut self) {
        self.visible = view::derive_indices(
            self.catalog.items(),
            &self.view.filter_text,
            self.view.sort_mode,
        );
    }

    /// Installs a freshly loaded catalog and opens whatever the address names.
    pub fn boot(&mut self, catalog: Catalog) -> Option<&CatalogItem> {
        self.replace_catalog(catalog);
        let id = self.link.resolve_from_location(&self.catalog)?.id.clone();
        self.open_item(&id)
    }

    pub fn replace_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        if let Some(open) = self.view.open_item_id.clone() {
            if self.catalog.find(&open).is_none() {
                tracing::debug!(id = %open, "open item disappeared after reload");
                self.close_item();
            }
        }
        self.rederive();
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.view.filter_text = text.into();
        self.rederive();
    }

    pub fn set_sort(&mut self, mode: SortMode) {
        self.view.sort_mode = mode;
        self.rederive();
    }

    /// Unknown ids leave every piece of state untouched.
    pub fn open_item(&mut self, id: &str) -> Option<&CatalogItem> {
        let position = self.catalog.position(id)?;
        self.view.open_item_id = Some(id.to_string());
        self.link.open_item(id);
        self.catalog.get(position)
    }

    pub fn close_item(&mut self) {
        self.view.open_item_id = None;
        self.link.close_item();
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn filter_text(&self) -> &str {
        &self.view.filter_text
    }

    pub fn sort_mode(&self) -> SortMode {
        self.view.sort_mode
    }

    pub fn visible(&self) -> impl Iterator<Item = &CatalogItem> + '_ {
        self.visible
            .iter()
            .filter_map(|&idx| self.catalog.get(idx))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_at(&self, row: usize) -> Option<&CatalogItem> {
        self.visible.get(row).and_then(|&idx| self.catalog.get(idx))
    }

    pub fn open_item_ref(&self) -> Option<&CatalogItem> {
        self.view
            .open_item_id
            .as_deref()
            .and_then(|id| self.catalog.find(id))
    }

    pub fn share_link(&self) -> String {
        self.link.share_link()
    }

    pub fn deep_link(&self) -> &DeepLink<A> {
        &self.link
    }
}
