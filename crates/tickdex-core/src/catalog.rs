//! Tag catalog discovered from the store.
//!
//! Every group is sorted ascending and deduplicated, so iteration order over
//! indexes and constituents is deterministic across passes.

use std::collections::BTreeMap;

use crate::store::{StoreError, TimeSeriesStore};
use crate::{CoreError, Tag};

/// Snapshot of tag membership taken at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    groups: BTreeMap<Tag, Vec<String>>,
}

impl Catalog {
    /// Read `@indexes`, `@products` and every tag registered under `@tags`.
    ///
    /// # Errors
    ///
    /// [`CoreError::TagNotFound`] if `@indexes` or `@products` is missing,
    /// [`CoreError::StoreUnavailable`] on transport failure.
    pub async fn discover<S>(store: &S) -> Result<Self, CoreError>
    where
        S: TimeSeriesStore + ?Sized,
    {
        let mut catalog = Self::default();

        // The meta-tag only names other groups; it is not a group itself.
        let optional = match store.list_entries_by_tag(&Tag::tags()).await {
            Ok(entries) => entries,
            Err(StoreError::TagNotFound(_)) => {
                log::debug!("store has no {} meta-tag", Tag::TAGS);
                Vec::new()
            }
            Err(error) => return Err(error.into()),
        };

        for required in [Tag::indexes(), Tag::products()] {
            let entries = store.list_entries_by_tag(&required).await?;
            catalog.insert(required, entries);
        }

        for name in optional {
            let tag = match Tag::parse(&name) {
                Ok(tag) => tag,
                Err(error) => {
                    log::warn!("ignoring entry '{name}' listed under {}: {error}", Tag::TAGS);
                    continue;
                }
            };
            if tag.as_str() == Tag::TAGS || catalog.groups.contains_key(&tag) {
                continue;
            }

            match store.list_entries_by_tag(&tag).await {
                Ok(entries) => catalog.insert(tag, entries),
                Err(StoreError::TagNotFound(_)) => {
                    log::warn!("tag {tag} vanished during catalog discovery, skipping");
                }
                Err(error) => return Err(error.into()),
            }
        }

        log::info!(
            "catalog discovered: {} indexes, {} products, {} tags",
            catalog.indexes().len(),
            catalog.products().len(),
            catalog.groups.len()
        );
        Ok(catalog)
    }

    /// Build a catalog from explicit groups, normalizing each one.
    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (Tag, Vec<String>)>,
    {
        let mut catalog = Self::default();
        for (tag, entries) in groups {
            catalog.insert(tag, entries);
        }
        catalog
    }

    /// Entries tagged `@indexes`, sorted.
    pub fn indexes(&self) -> &[String] {
        self.group_str(Tag::INDEXES)
    }

    /// Entries tagged `@products`, sorted.
    pub fn products(&self) -> &[String] {
        self.group_str(Tag::PRODUCTS)
    }

    /// Entries carrying `tag`, or an empty slice for an unknown tag.
    pub fn group(&self, tag: &Tag) -> &[String] {
        self.groups.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every resolved tag, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> + '_ {
        self.groups.keys()
    }

    /// Every resolved group in tag order.
    pub fn groups(&self) -> impl Iterator<Item = (&Tag, &[String])> + '_ {
        self.groups
            .iter()
            .map(|(tag, entries)| (tag, entries.as_slice()))
    }

    pub fn contains_product(&self, name: &str) -> bool {
        self.products()
            .binary_search_by(|product| product.as_str().cmp(name))
            .is_ok()
    }

    fn group_str(&self, tag: &str) -> &[String] {
        self.groups
            .iter()
            .find(|(key, _)| key.as_str() == tag)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or_default()
    }

    fn insert(&mut self, tag: Tag, mut entries: Vec<String>) {
        entries.sort();
        entries.dedup();
        self.groups.insert(tag, entries);
    }
}
