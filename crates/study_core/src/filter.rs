use crate::schema::{Category, DocumentId, StoredLocation};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Keyword selecting the favorites filter instead of a category.
pub const FAVORITES_KEYWORD: &str = "fav";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    Category(Category),
    Favorites,
}

impl From<&str> for ListFilter {
    fn from(value: &str) -> Self {
        if value == FAVORITES_KEYWORD {
            ListFilter::Favorites
        } else {
            ListFilter::Category(Category::from(value))
        }
    }
}

impl FromStr for ListFilter {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(ListFilter::from(value))
    }
}

/// Favorite locations, keyed by document id so that two locations sharing
/// a name stay distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites {
    ids: BTreeSet<DocumentId>,
}

impl Favorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<DocumentId>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentId> {
        self.ids.iter()
    }
}

impl<I: Into<DocumentId>> FromIterator<I> for Favorites {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Filter state owned by the list/map view. Rebuilt on every render.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub selected: Option<ListFilter>,
    pub search_text: String,
    pub favorites: Favorites,
}

impl FilterState {
    pub fn should_show(&self, record: &StoredLocation) -> bool {
        should_show(
            record,
            self.selected.as_ref(),
            &self.search_text,
            &self.favorites,
        )
    }

    /// Records passing the filter, in source order.
    pub fn visible<'a>(&self, records: &'a [StoredLocation]) -> Vec<&'a StoredLocation> {
        records
            .iter()
            .filter(|record| self.should_show(record))
            .collect()
    }
}

pub fn should_show(
    record: &StoredLocation,
    selected: Option<&ListFilter>,
    search_text: &str,
    favorites: &Favorites,
) -> bool {
    matches_filter(record, selected, favorites) && matches_search(&record.location.name, search_text)
}

fn matches_filter(
    record: &StoredLocation,
    selected: Option<&ListFilter>,
    favorites: &Favorites,
) -> bool {
    match selected {
        None => true,
        Some(ListFilter::Category(category)) => record.location.category == *category,
        // A record tagged with the keyword itself also counts as a favorite.
        Some(ListFilter::Favorites) => {
            favorites.contains(&record.id)
                || record.location.category.as_str() == FAVORITES_KEYWORD
        }
    }
}

fn matches_search(name: &str, search_text: &str) -> bool {
    search_text.is_empty() || name.to_lowercase().contains(&search_text.to_lowercase())
}
