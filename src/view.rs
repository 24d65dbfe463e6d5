use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::catalog::CatalogItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    #[serde(alias = "new")]
    Newest,
    Az,
    Za,
}

pub const SORT_MODES: [SortMode; 3] = [SortMode::Newest, SortMode::Az, SortMode::Za];

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Newest => "newest",
            SortMode::Az => "az",
            SortMode::Za => "za",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Newest => "Newest",
            SortMode::Az => "A → Z",
            SortMode::Za => "Z → A",
        }
    }

    pub fn next(self) -> Self {
        let idx = SORT_MODES.iter().position(|m| *m == self).unwrap_or(0);
        SORT_MODES[(idx + 1) % SORT_MODES.len()]
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort mode {0:?} (expected newest, az or za)")]
pub struct ParseSortModeError(String);

impl FromStr for SortMode {
    type Err = ParseSortModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" | "new" => Ok(SortMode::Newest),
            "az" | "a-z" => Ok(SortMode::Az),
            "za" | "z-a" => Ok(SortMode::Za),
            _ => Err(ParseSortModeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filter_text: String,
    pub sort_mode: SortMode,
    pub open_item_id: Option<String>,
}

pub fn matches(item: &CatalogItem, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    item.title.to_lowercase().contains(needle)
        || item.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

/// Positions into `catalog` of the visible items, in display order.
pub fn derive_indices(catalog: &[CatalogItem], filter_text: &str, sort: SortMode) -> Vec<usize> {
    let needle = filter_text.to_lowercase();
    let mut indices: Vec<usize> = catalog
        .iter()
        .enumerate()
        .filter(|(_, item)| matches(item, &needle))
        .map(|(idx, _)| idx)
        .collect();

    // sort_by is stable
    match sort {
        SortMode::Newest => {
            indices.sort_by(|&a, &b| catalog[b].added_at.cmp(&catalog[a].added_at))
        }
        SortMode::Az => indices.sort_by(|&a, &b| locale_cmp(&catalog[a].title, &catalog[b].title)),
        SortMode::Za => indices.sort_by(|&a, &b| locale_cmp(&catalog[b].title, &catalog[a].title)),
    }
    indices
}

pub fn derive<'a>(
    catalog: &'a [CatalogItem],
    filter_text: &str,
    sort: SortMode,
) -> Vec<&'a CatalogItem> {
    derive_indices(catalog, filter_text, sort)
        .into_iter()
        .map(|idx| &catalog[idx])
        .collect()
}

/// Title collation: letters first with accents and case folded away, then
/// unaccented before accented, then lowercase before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let primary = folded(a).cmp(folded(b));
    if primary != Ordering::Equal {
        return primary;
    }
    let secondary = a
        .nfd()
        .flat_map(char::to_lowercase)
        .cmp(b.nfd().flat_map(char::to_lowercase));
    if secondary != Ordering::Equal {
        return secondary;
    }
    let tertiary = a
        .chars()
        .map(case_rank)
        .cmp(b.chars().map(case_rank));
    tertiary.then_with(|| a.cmp(b))
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
}

fn case_rank(ch: char) -> u8 {
    if ch.is_uppercase() {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, title: &str, tags: &[&str], added_at: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            title: title.to_string(),
            poster: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            year: String::new(),
            embed: String::new(),
            confidence: true,
            added_at: added_at.to_string(),
        }
    }

    fn titles(items: &[&CatalogItem]) -> Vec<String> {
        items.iter().map(|i| i.title.clone()).collect()
    }

    fn sample() -> Vec<CatalogItem> {
        vec![
            item("a", "Dune", &["scifi"], "2021-01-01"),
            item("b", "Amadeus", &["drama"], "2023-01-01"),
        ]
    }

    #[test]
    fn worked_example() {
        let catalog = sample();
        assert_eq!(titles(&derive(&catalog, "", SortMode::Az)), ["Amadeus", "Dune"]);
        assert_eq!(titles(&derive(&catalog, "", SortMode::Newest)), ["Amadeus", "Dune"]);
        assert_eq!(titles(&derive(&catalog, "dune", SortMode::Az)), ["Dune"]);
    }

    #[test]
    fn empty_filter_keeps_every_item_once() {
        let catalog = vec![
            item("1", "Heat", &[], "2020"),
            item("2", "heat", &[], "2020"),
            item("3", "Alien", &["horror"], ""),
            item("4", "Zodiac", &[], "2019-05-05T10:00:00Z"),
        ];
        for mode in SORT_MODES {
            let mut ids: Vec<_> = derive(&catalog, "", mode).iter().map(|i| i.id.clone()).collect();
            ids.sort();
            assert_eq!(ids, ["1", "2", "3", "4"], "mode {mode}");
        }
    }

    #[test]
    fn filter_is_case_insensitive_over_title_and_tags() {
        let catalog = vec![
            item("atlas", "Atlas", &["retro"], "2020"),
            item("other", "Other", &["noir"], "2020"),
        ];
        assert_eq!(titles(&derive(&catalog, "ATL", SortMode::Az)), ["Atlas"]);
        assert_eq!(titles(&derive(&catalog, "RETRO", SortMode::Az)), ["Atlas"]);
        assert!(derive(&catalog, "western", SortMode::Az).is_empty());
    }

    #[test]
    fn az_and_za_are_reverse_of_each_other() {
        let catalog = vec![
            item("1", "zulu", &[], ""),
            item("2", "Bravo", &[], ""),
            item("3", "alpha", &[], ""),
            item("4", "Charlie", &[], ""),
        ];
        let az = titles(&derive(&catalog, "", SortMode::Az));
        let mut za = titles(&derive(&catalog, "", SortMode::Za));
        za.reverse();
        assert_eq!(az, ["alpha", "Bravo", "Charlie", "zulu"]);
        assert_eq!(az, za);
    }

    #[test]
    fn newest_compares_raw_strings() {
        let catalog = vec![
            item("1", "A", &[], "2024-01-01T00:00:00Z"),
            item("2", "B", &[], "2024-01-01T00:00:00.500Z"),
            item("3", "C", &[], ""),
        ];
        // '.' sorts before 'Z', so the fractional timestamp counts as older.
        assert_eq!(titles(&derive(&catalog, "", SortMode::Newest)), ["A", "B", "C"]);
    }

    #[test]
    fn newest_is_stable_for_equal_timestamps() {
        let catalog = vec![
            item("1", "First", &[], "2020"),
            item("2", "Second", &[], "2020"),
        ];
        assert_eq!(titles(&derive(&catalog, "", SortMode::Newest)), ["First", "Second"]);
    }

    #[test]
    fn lowercase_first_on_case_ties() {
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("Apple", "apricot"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn accented_titles_sort_with_their_base_letters() {
        let catalog = vec![
            item("1", "Zodiac", &[], ""),
            item("2", "Élite", &[], ""),
            item("3", "Amerika", &[], ""),
            item("4", "Amélie", &[], ""),
        ];
        assert_eq!(
            titles(&derive(&catalog, "", SortMode::Az)),
            ["Amélie", "Amerika", "Élite", "Zodiac"]
        );
        assert_eq!(
            titles(&derive(&catalog, "", SortMode::Za)),
            ["Zodiac", "Élite", "Amerika", "Amélie"]
        );
    }

    #[test]
    fn accents_break_ties_before_case() {
        assert_eq!(locale_cmp("cote", "côte"), Ordering::Less);
        assert_eq!(locale_cmp("Cote", "côte"), Ordering::Less);
        assert_eq!(locale_cmp("élan", "Élan"), Ordering::Less);
    }

    #[test]
    fn sort_mode_parsing() {
        assert_eq!("new".parse::<SortMode>().unwrap(), SortMode::Newest);
        assert_eq!("AZ".parse::<SortMode>().unwrap(), SortMode::Az);
        assert_eq!("za".parse::<SortMode>().unwrap(), SortMode::Za);
        assert!("random".parse::<SortMode>().is_err());
        assert_eq!(SortMode::Za.next(), SortMode::Newest);
    }
}
