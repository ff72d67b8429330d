//! Filtering and sorting over an in-memory snapshot of the gallery.
//!
//! Nothing here touches the store: callers fetch items once (see
//! [`MediaStore::get_all`](shoebox_store::MediaStore::get_all)) and then
//! re-run [`filter`] and [`sort`] as the view changes.

use serde::{Deserialize, Serialize};
use shoebox_media::{MediaItem, MediaKind};
use std::cmp::Ordering;
use std::ops::RangeInclusive;

/// Inclusive range with optionally open ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}
impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}
impl<T: Copy> From<RangeInclusive<T>> for Bounds<T> {
    fn from(range: RangeInclusive<T>) -> Self {
        Self {
            min: Some(*range.start()),
            max: Some(*range.end()),
        }
    }
}

/// Predicates applied by [`filter`]. Every predicate that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Allowed kinds; empty allows every kind.
    #[serde(default)]
    pub kinds: Vec<MediaKind>,
    #[serde(default)]
    pub size_range: Option<Bounds<u64>>,
    /// Bounds on `last_modified`, in epoch milliseconds.
    #[serde(default)]
    pub date_range: Option<Bounds<i64>>,
    /// Case-insensitive substring of the item name.
    #[serde(default)]
    pub search_query: Option<String>,
}
impl FilterOptions {
    pub fn matches(&self, item: &MediaItem) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&item.kind))
            && self.size_range.is_none_or(|range| range.contains(item.size()))
            && self.date_range.is_none_or(|range| range.contains(item.last_modified()))
            && self.search_matches(item.name())
    }

    fn search_matches(&self, name: &str) -> bool {
        match self.search_query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => name.to_lowercase().contains(&query.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Size,
    Date,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOptions {
    pub sort_by: SortBy,
    pub order: SortOrder,
}

/// Keep the items matching every predicate in `options`, preserving order.
pub fn filter(items: &[MediaItem], options: &FilterOptions) -> Vec<MediaItem> {
    items.iter().filter(|item| options.matches(item)).cloned().collect()
}

/// Stable sort. Items with equal keys keep their relative order, in both
/// directions.
pub fn sort(mut items: Vec<MediaItem>, options: &SortOptions) -> Vec<MediaItem> {
    items.sort_by(|a, b| {
        let ordering = match options.sort_by {
            SortBy::Name => compare_names(a.name(), b.name()),
            SortBy::Size => a.size().cmp(&b.size()),
            SortBy::Date => a.last_modified().cmp(&b.last_modified()),
        };
        match options.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    items
}

/// Items inside exactly `folder_path`, filtered and then sorted.
///
/// Subfolders are not included: `Trip/day1` is a different folder to `Trip`.
pub fn current_folder_files(
    items: &[MediaItem],
    folder_path: &str,
    filters: &FilterOptions,
    sorting: &SortOptions,
) -> Vec<MediaItem> {
    let in_folder: Vec<MediaItem> = items
        .iter()
        .filter(|item| item.folder_path() == Some(folder_path) && filters.matches(item))
        .cloned()
        .collect();
    sort(in_folder, sorting)
}

/// Human-friendly name ordering: case-insensitive, with digit runs compared
/// by value so `img2` sorts before `img10`. Falls back to a plain comparison
/// so that distinct names never compare equal.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    natural_cmp(&a.to_lowercase(), &b.to_lowercase()).then_with(|| a.cmp(b))
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.chars().next(), b.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (run_a, rest_a) = split_digits(a);
                let (run_b, rest_b) = split_digits(b);
                let ordering = compare_digit_runs(run_a, run_b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
                (a, b) = (rest_a, rest_b);
            },
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                (a, b) = (&a[x.len_utf8()..], &b[y.len_utf8()..]);
            },
        }
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Compare two runs of ASCII digits by numeric value without parsing, so
/// arbitrarily long runs cannot overflow. Leading zeros break ties.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let trimmed_a = a.trim_start_matches('0');
    let trimmed_b = b.trim_start_matches('0');
    trimmed_a
        .len()
        .cmp(&trimmed_b.len())
        .then_with(|| trimmed_a.cmp(trimmed_b))
        .then_with(|| a.len().cmp(&b.len()))
}
