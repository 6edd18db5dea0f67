use tracing::warn;

use crate::models::{Item, ItemId, ResourceKind};

/// Number of page buttons offered around the current page.
const PAGE_WINDOW: usize = 5;

/// In-memory list for one resource type with search and pagination.
///
/// Pages are one-based. Filtering and paging only derive views; the stored
/// sequence changes through [`set_items`](Self::set_items),
/// [`upsert`](Self::upsert) and [`remove`](Self::remove) alone.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    items: Vec<Item>,
    id_key: &'static str,
    search_fields: &'static [&'static str],
    page_size: usize,
    search: String,
    page: usize,
}

impl CollectionStore {
    /// Store laid out for the given resource.
    pub fn new(kind: ResourceKind) -> Self {
        Self::with_layout(kind.id_key(), kind.search_fields(), kind.page_size())
    }

    /// Store with an explicit identity key, search fields and page size.
    pub fn with_layout(
        id_key: &'static str,
        search_fields: &'static [&'static str],
        page_size: usize,
    ) -> Self {
        Self {
            items: Vec::new(),
            id_key,
            search_fields,
            page_size: page_size.max(1),
            search: String::new(),
            page: 1,
        }
    }

    /// Replace the whole collection and go back to the first page.
    ///
    /// Duplicate keys keep the first position and the last value; items
    /// without a key cannot be tracked and are dropped.
    pub fn set_items(&mut self, items: Vec<Item>) {
        self.items.clear();
        for item in items {
            if item.id(self.id_key).is_none() {
                warn!(key = self.id_key, "dropping item without identity key");
                continue;
            }
            self.upsert(item);
        }
        self.page = 1;
    }

    /// Update the search term and go back to the first page.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.page = 1;
    }

    /// Current search term.
    pub fn search_term(&self) -> &str {
        &self.search
    }

    /// Items matching the search term, in insertion order.
    pub fn filtered(&self) -> Vec<&Item> {
        let needle = self.search.to_lowercase();
        self.items
            .iter()
            .filter(|item| item.matches(self.search_fields, &needle))
            .collect()
    }

    /// Number of pages; an empty result still has one (empty) page.
    pub fn page_count(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size).max(1)
    }

    /// Items of page `n`; out-of-range pages are empty.
    pub fn page(&self, n: usize) -> Vec<&Item> {
        if n == 0 {
            return Vec::new();
        }
        self.filtered()
            .into_iter()
            .skip((n - 1) * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// The one-based index of the page being viewed.
    pub fn current_page(&self) -> usize {
        self.page
    }

    /// Items of the page being viewed.
    pub fn current_items(&self) -> Vec<&Item> {
        self.page(self.page)
    }

    /// Jump to page `n` if it exists. Returns whether the page changed.
    pub fn set_page(&mut self, n: usize) -> bool {
        if n == 0 || n > self.page_count() || n == self.page {
            return false;
        }
        self.page = n;
        true
    }

    /// Advance one page, stopping at the last.
    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page + 1)
    }

    /// Go back one page, stopping at the first.
    pub fn prev_page(&mut self) -> bool {
        self.page > 1 && self.set_page(self.page - 1)
    }

    /// Page numbers to offer around the current page.
    pub fn page_window(&self) -> Vec<usize> {
        let count = self.page_count();
        let half = PAGE_WINDOW / 2;
        let start = self.page.saturating_sub(half).max(1);
        let end = (self.page + half).min(count);
        (start..=end).collect()
    }

    /// Insert `item`, replacing an existing item with the same key in place.
    pub fn upsert(&mut self, item: Item) {
        let Some(id) = item.id(self.id_key) else {
            warn!(key = self.id_key, "ignoring upsert of item without identity key");
            return;
        };
        match self.position(&id) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    /// Remove the item with `id`. Absent ids are a no-op.
    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        self.page = self.page.min(self.page_count());
        Some(removed)
    }

    /// Look an item up by identity.
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.position(id).map(|index| &self.items[index])
    }

    /// Every stored item, ignoring the search term.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Identity key field of this collection.
    pub fn id_key(&self) -> &'static str {
        self.id_key
    }

    /// Configured page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn position(&self, id: &ItemId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.id(self.id_key).as_ref() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn developer(id: u64, name: &str) -> Item {
        Item::new().with("id_dev", id).with("nama_dev", name)
    }

    fn developers() -> CollectionStore {
        let mut store = CollectionStore::new(ResourceKind::Developers);
        store.set_items(vec![
            developer(1, "Valve"),
            developer(2, "id Software"),
            developer(3, "Bungie"),
            developer(4, "Valve South"),
            developer(5, "Bethesda"),
            developer(6, "BioWare"),
            developer(7, "Blizzard"),
        ]);
        store
    }

    fn names(items: &[&Item]) -> Vec<String> {
        items.iter().map(|item| item.text("nama_dev")).collect()
    }

    #[test]
    fn filter_is_a_case_insensitive_subsequence() {
        let mut store = developers();
        store.set_search_term("VALVE");
        let filtered = store.filtered();
        assert_eq!(names(&filtered), ["Valve", "Valve South"]);
        for item in &filtered {
            assert!(item.text("nama_dev").to_lowercase().contains("valve"));
            assert!(store.items().contains(*item));
        }

        store.set_search_term("");
        assert_eq!(store.filtered().len(), store.len());
        assert_eq!(
            store.filtered().into_iter().cloned().collect::<Vec<_>>(),
            store.items()
        );
    }

    #[test]
    fn filter_keeps_surrounding_whitespace() {
        let mut store = CollectionStore::new(ResourceKind::Developers);
        store.set_items(vec![
            developer(1, "Xbox Live Arcade"),
            developer(2, "Halo X"),
        ]);
        store.set_search_term(" x");
        let filtered = store.filtered();
        assert_eq!(names(&filtered), ["Halo X"]);
        for item in &filtered {
            assert!(item.text("nama_dev").to_lowercase().contains(" x"));
        }
    }

    #[test]
    fn pages_reconstruct_the_filtered_sequence() {
        let mut store = developers();
        for term in ["", "b", "zzz"] {
            store.set_search_term(term);
            let rebuilt: Vec<&Item> = (1..=store.page_count())
                .flat_map(|n| store.page(n))
                .collect();
            assert_eq!(rebuilt, store.filtered(), "term {term:?}");
        }
    }

    #[test]
    fn page_arithmetic() {
        let mut store = developers();
        assert_eq!(store.page_size(), 5);
        assert_eq!(store.page_count(), 2);
        assert_eq!(store.page(1).len(), 5);
        assert_eq!(names(&store.page(2)), ["BioWare", "Blizzard"]);
        assert!(store.page(0).is_empty());
        assert!(store.page(3).is_empty());

        store.set_search_term("nothing matches");
        assert_eq!(store.page_count(), 1);
        assert!(store.page(1).is_empty());

        let empty = CollectionStore::new(ResourceKind::Games);
        assert_eq!(empty.page_count(), 1);
        assert!(empty.current_items().is_empty());
    }

    #[test]
    fn navigation_stays_in_range_and_search_resets_page() {
        let mut store = developers();
        assert!(!store.prev_page());
        assert!(store.next_page());
        assert_eq!(store.current_page(), 2);
        assert!(!store.next_page());
        assert!(!store.set_page(3));
        assert!(!store.set_page(0));

        store.set_search_term("b");
        assert_eq!(store.current_page(), 1);

        assert!(!store.set_page(1));
        store.set_search_term("");
        store.set_page(2);
        store.set_items(vec![developer(9, "Remedy")]);
        assert_eq!(store.current_page(), 1);
    }

    #[test]
    fn page_window_is_clipped() {
        let mut store = CollectionStore::with_layout("id_dev", &["nama_dev"], 1);
        store.set_items((1..=8).map(|id| developer(id, "dev")).collect());
        assert_eq!(store.page_window(), [1, 2, 3]);
        store.set_page(5);
        assert_eq!(store.page_window(), [3, 4, 5, 6, 7]);
        store.set_page(8);
        assert_eq!(store.page_window(), [6, 7, 8]);
    }

    #[test]
    fn upsert_replaces_in_place_and_is_idempotent() {
        let mut store = developers();
        let renamed = developer(3, "Bungie Studios");
        store.upsert(renamed.clone());
        let once = store.items().to_vec();
        store.upsert(renamed);
        assert_eq!(store.items(), once.as_slice());
        assert_eq!(store.items()[2].text("nama_dev"), "Bungie Studios");
        assert_eq!(store.len(), 7);

        store.upsert(developer(8, "Remedy"));
        assert_eq!(
            store.items().last().map(|i| i.text("nama_dev")),
            Some("Remedy".to_string())
        );
    }

    #[test]
    fn remove_twice_is_a_no_op() {
        let mut store = developers();
        let id = ItemId::from(2);
        assert!(store.remove(&id).is_some());
        let after_first = store.items().to_vec();
        assert!(store.remove(&id).is_none());
        assert_eq!(store.items(), after_first.as_slice());

        let before = store.items().to_vec();
        assert!(store.remove(&ItemId::from(42)).is_none());
        assert_eq!(store.items(), before.as_slice());
    }

    #[test]
    fn removing_the_last_item_of_a_page_clamps_the_index() {
        let mut store = developers();
        store.set_page(2);
        store.remove(&ItemId::from(6));
        store.remove(&ItemId::from(7));
        assert_eq!(store.page_count(), 1);
        assert_eq!(store.current_page(), 1);
    }

    #[test]
    fn set_items_keeps_keys_unique() {
        let mut store = CollectionStore::new(ResourceKind::Genres);
        store.set_items(vec![
            Item::new().with("id_genre", 1).with("nama_genre", "RPG"),
            Item::new().with("id_genre", 2).with("nama_genre", "FPS"),
            Item::new().with("id_genre", "1").with("nama_genre", "Role-playing"),
            Item::new().with("nama_genre", "orphan"),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.items()[0].text("nama_genre"), "Role-playing");
    }

    #[test]
    fn users_search_username_and_full_name() {
        let mut store = CollectionStore::new(ResourceKind::Users);
        store.set_items(vec![
            Item::new()
                .with("id", 1)
                .with("username", "admin")
                .with("fullname", "Site Owner"),
            Item::new()
                .with("id", 2)
                .with("username", "jdoe")
                .with("fullname", "Jane Doe"),
        ]);
        store.set_search_term("owner");
        assert_eq!(store.filtered().len(), 1);
        store.set_search_term("JD");
        assert_eq!(store.filtered()[0].text("fullname"), "Jane Doe");
    }
}
