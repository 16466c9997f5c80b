//! Query filter engine for content listings.
//!
//! Each recognized request parameter is parsed by a pure function into an
//! optional predicate; a value that fails to parse yields no predicate at
//! all (fail-open), so a malformed filter degrades to "no constraint from
//! this parameter" instead of surfacing an error. The active predicates are
//! then pushed onto an `sqlx::QueryBuilder` as one AND-conjunction.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{QueryBuilder, sqlite::Sqlite};

/// Raw filter parameters as they arrive on `GET /contents`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentFilterQuery {
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub copyright: Option<String>,
    pub active: Option<String>,
    pub metadata: Option<String>,
    pub published_date: Option<String>,
}

/// Parsed filter set, ready to be applied to a query.
#[derive(Debug, Clone, Default)]
pub struct ContentFilters {
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub copyright: Option<String>,
    pub active: Option<bool>,
    pub metadata_ids: Option<Vec<i64>>,
    pub published_range: Option<(NaiveDate, NaiveDate)>,
}

impl ContentFilters {
    /// Parse raw request parameters. Substring filters pass through
    /// untouched; the typed filters go through their fail-open parsers.
    pub fn parse(query: &ContentFilterQuery) -> Self {
        Self {
            title: query.title.clone(),
            file_name: query.file_name.clone(),
            copyright: query.copyright.clone(),
            active: query.active.as_deref().map(parse_active),
            metadata_ids: query.metadata.as_deref().and_then(parse_metadata_ids),
            published_range: query
                .published_date
                .as_deref()
                .and_then(parse_published_range),
        }
    }

    /// Push the WHERE clause for all active predicates.
    ///
    /// The conjunction starts from a vacuous `1=1` so every predicate can
    /// be appended uniformly with `AND`.
    pub fn apply(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1=1");

        if let Some(title) = &self.title {
            builder.push(" AND title LIKE ");
            builder.push_bind(format!("%{}%", title));
        }
        if let Some(file_name) = &self.file_name {
            builder.push(" AND file_name LIKE ");
            builder.push_bind(format!("%{}%", file_name));
        }
        if let Some(copyright) = &self.copyright {
            builder.push(" AND copyright LIKE ");
            builder.push_bind(format!("%{}%", copyright));
        }
        if let Some(active) = self.active {
            builder.push(" AND active = ");
            builder.push_bind(active);
        }
        if let Some(ids) = &self.metadata_ids {
            // Conjunction of membership tests: the record must carry ALL
            // listed tags, not any of them.
            for id in ids {
                builder.push(
                    " AND EXISTS (SELECT 1 FROM content_metadata cm \
                     WHERE cm.content_id = contents.id AND cm.metadata_id = ",
                );
                builder.push_bind(*id);
                builder.push(")");
            }
        }
        if let Some((start, end)) = self.published_range {
            builder.push(" AND published_date BETWEEN ");
            builder.push_bind(start);
            builder.push(" AND ");
            builder.push_bind(end);
        }
    }
}

/// `"true"` in any casing means true; every other value, typos included,
/// resolves to false.
pub fn parse_active(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

/// Parse a comma-separated list of tag ids.
///
/// Any non-integer token drops the whole filter, not just the bad token.
pub fn parse_metadata_ids(raw: &str) -> Option<Vec<i64>> {
    raw.split(',')
        .map(|token| token.trim().parse::<i64>().ok())
        .collect()
}

/// Parse up to two comma-separated year tokens into an inclusive date range.
///
/// Each token gets `-01-01` appended; tokens beyond the first two are
/// ignored. A single token repeats as both bounds. Any unparseable token
/// drops the filter.
pub fn parse_published_range(raw: &str) -> Option<(NaiveDate, NaiveDate)> {
    let mut bounds = raw
        .split(',')
        .take(2)
        .map(|year| NaiveDate::parse_from_str(&format!("{}-01-01", year.trim()), "%Y-%m-%d"));

    let start = bounds.next()?.ok()?;
    let end = match bounds.next() {
        Some(parsed) => parsed.ok()?,
        None => start,
    };
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_is_true_only_for_literal_true() {
        assert!(parse_active("true"));
        assert!(parse_active("TRUE"));
        assert!(parse_active("True"));
        assert!(!parse_active("yes"));
        assert!(!parse_active("1"));
        assert!(!parse_active("truee"));
        assert!(!parse_active(""));
    }

    #[test]
    fn metadata_ids_parse_or_drop_entirely() {
        assert_eq!(parse_metadata_ids("1,2,3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_metadata_ids("7"), Some(vec![7]));
        assert_eq!(parse_metadata_ids("abc,2"), None);
        assert_eq!(parse_metadata_ids("1,,2"), None);
        assert_eq!(parse_metadata_ids(""), None);
    }

    #[test]
    fn published_range_two_years() {
        let (start, end) = parse_published_range("2020,2022").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
    }

    #[test]
    fn published_range_single_year_repeats_bound() {
        let (start, end) = parse_published_range("2021").unwrap();
        assert_eq!(start, end);
        assert_eq!(start, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }

    #[test]
    fn published_range_slices_to_first_two_tokens() {
        let (start, end) = parse_published_range("2019,2020,2024").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn published_range_malformed_is_dropped() {
        assert!(parse_published_range("recent").is_none());
        assert!(parse_published_range("2020,next").is_none());
        assert!(parse_published_range("").is_none());
    }

    #[test]
    fn parse_maps_absent_params_to_no_predicates() {
        let filters = ContentFilters::parse(&ContentFilterQuery::default());
        assert!(filters.title.is_none());
        assert!(filters.active.is_none());
        assert!(filters.metadata_ids.is_none());
        assert!(filters.published_range.is_none());
    }

    #[test]
    fn parse_keeps_well_formed_filters() {
        let query = ContentFilterQuery {
            title: Some("report".into()),
            active: Some("TRUE".into()),
            metadata: Some("1,2".into()),
            published_date: Some("2020,2022".into()),
            ..Default::default()
        };
        let filters = ContentFilters::parse(&query);
        assert_eq!(filters.title.as_deref(), Some("report"));
        assert_eq!(filters.active, Some(true));
        assert_eq!(filters.metadata_ids, Some(vec![1, 2]));
        assert!(filters.published_range.is_some());
    }
}
