// Filter-option domains and multi-valued selection semantics
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Dataset, PlayEvent};

/// Distinct values per filterable dimension. Years are sorted ascending;
/// the other dimensions are left unordered (ordering is presentation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub artists: Vec<String>,
    pub albums: Vec<String>,
    pub songs: Vec<String>,
}

fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

/// Compute the filter-option domains for a dataset.
pub fn filter_options(dataset: &Dataset) -> FilterOptions {
    let mut years: Vec<i32> = dataset
        .events
        .iter()
        .map(|e| e.year)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    years.sort_unstable();

    FilterOptions {
        years,
        artists: distinct(dataset.events.iter().map(|e| e.artist.clone())),
        albums: distinct(dataset.events.iter().map(|e| e.album.clone())),
        songs: distinct(dataset.events.iter().map(|e| e.track.clone())),
    }
}

/// Multi-valued selection over the filterable dimensions. An empty
/// selection on a dimension means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub years: Vec<i32>,
    pub artists: Vec<String>,
    pub albums: Vec<String>,
    pub songs: Vec<String>,
}

impl FilterSelection {
    pub fn is_unrestricted(&self) -> bool {
        self.years.is_empty()
            && self.artists.is_empty()
            && self.albums.is_empty()
            && self.songs.is_empty()
    }
}

/// A selection restricts only when it is non-empty and not the full
/// domain; selecting everything is equivalent to selecting nothing.
fn restriction<'a, T: Eq + std::hash::Hash>(
    selected: &'a [T],
    domain: &[T],
) -> Option<HashSet<&'a T>> {
    if selected.is_empty() {
        return None;
    }
    let set: HashSet<&T> = selected.iter().collect();
    let full_domain = domain.len() == set.len() && domain.iter().all(|v| set.contains(v));
    if full_domain {
        return None;
    }
    Some(set)
}

/// Apply a selection to a dataset. Returns `None` when no dimension
/// actually restricts, signalling the caller to use the dataset as-is
/// and skip the filtering pass entirely.
pub fn apply_selection(
    dataset: &Dataset,
    selection: &FilterSelection,
    options: &FilterOptions,
) -> Option<Vec<PlayEvent>> {
    let years = restriction(&selection.years, &options.years);
    let artists = restriction(&selection.artists, &options.artists);
    let albums = restriction(&selection.albums, &options.albums);
    let songs = restriction(&selection.songs, &options.songs);

    if years.is_none() && artists.is_none() && albums.is_none() && songs.is_none() {
        return None;
    }

    let passes = |event: &PlayEvent| {
        years.as_ref().map_or(true, |set| set.contains(&event.year))
            && artists
                .as_ref()
                .map_or(true, |set| set.contains(&event.artist))
            && albums
                .as_ref()
                .map_or(true, |set| set.contains(&event.album))
            && songs.as_ref().map_or(true, |set| set.contains(&event.track))
    };

    Some(
        dataset
            .events
            .iter()
            .filter(|event| passes(event))
            .cloned()
            .collect(),
    )
}
