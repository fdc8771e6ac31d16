//! Translates the flat listing parameters into an [`EventQuery`]: a
//! storage-independent predicate plus sort order. Drivers either evaluate
//! it directly ([`EventQuery::matches`], [`EventQuery::compare`]) or compile
//! it to SQL.

pub mod pagination;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::error::FieldError;
use crate::models::Event;

pub use pagination::{Page, PageRequest, Pagination};

/// Sentinel meaning "no constraint" for category and price.
pub const ALL: &str = "all";

/// Raw filter set as it travels through URL query strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

impl EventFilters {
    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(self).unwrap_or_default()
    }

    pub fn from_query_string(query: &str) -> Result<Self, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str(query.trim_start_matches('?'))
    }

    /// Overlays every field set in `other`.
    pub fn merge(&mut self, other: EventFilters) {
        if other.category.is_some() {
            self.category = other.category;
        }
        if other.search.is_some() {
            self.search = other.search;
        }
        if other.date.is_some() {
            self.date = other.date;
        }
        if other.location.is_some() {
            self.location = other.location;
        }
        if other.price.is_some() {
            self.price = other.price;
        }
        if other.sort_by.is_some() {
            self.sort_by = other.sort_by;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceFilter {
    #[default]
    Any,
    Free,
    Paid,
}

impl PriceFilter {
    /// Unknown buckets impose no constraint.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("free") => PriceFilter::Free,
            Some("paid") => PriceFilter::Paid,
            _ => PriceFilter::Any,
        }
    }

    pub fn matches(&self, price: f64) -> bool {
        match self {
            PriceFilter::Any => true,
            PriceFilter::Free => price == 0.0,
            PriceFilter::Paid => price > 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Date,
    DateDesc,
    Price,
    PriceDesc,
    Created,
}

impl SortKey {
    /// Unrecognised keys fall back to ascending date.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("date-desc") => SortKey::DateDesc,
            Some("price") => SortKey::Price,
            Some("price-desc") => SortKey::PriceDesc,
            Some("created") => SortKey::Created,
            _ => SortKey::Date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::DateDesc => "date-desc",
            SortKey::Price => "price",
            SortKey::PriceDesc => "price-desc",
            SortKey::Created => "created",
        }
    }

    /// Total order; ties broken by id so pages never overlap.
    pub fn compare(&self, a: &Event, b: &Event) -> Ordering {
        let primary = match self {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::DateDesc => b.date.cmp(&a.date),
            SortKey::Price => a.price.total_cmp(&b.price),
            SortKey::PriceDesc => b.price.total_cmp(&a.price),
            SortKey::Created => b.created_at.cmp(&a.created_at),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Half-open UTC day: `start <= date < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayRange {
    pub fn for_date(day: NaiveDate) -> Self {
        let start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        DayRange {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its UTC day is used).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Some(Self::for_date(day));
        }
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|ts| Self::for_date(ts.with_timezone(&Utc).date_naive()))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Organizer-side visibility filter for the "my events" listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("active") => StatusFilter::Active,
            Some("inactive") => StatusFilter::Inactive,
            _ => StatusFilter::All,
        }
    }

    fn as_active(&self) -> Option<bool> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Active => Some(true),
            StatusFilter::Inactive => Some(false),
        }
    }
}

/// Compiled listing query. Every set constraint is ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub active: Option<bool>,
    pub organizer: Option<Uuid>,
    /// Exact match against the category name.
    pub category: Option<String>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    pub day: Option<DayRange>,
    pub price: PriceFilter,
    /// Case-insensitive substring of the address.
    pub location: Option<String>,
    pub sort: SortKey,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl EventQuery {
    /// Public listing: active events only, narrowed by `filters`.
    pub fn public(filters: &EventFilters) -> Result<Self, Vec<FieldError>> {
        let day = match present(&filters.date) {
            Some(raw) => Some(DayRange::parse(&raw).ok_or_else(|| {
                vec![FieldError::new("date", "Please provide a valid date")]
            })?),
            None => None,
        };

        Ok(EventQuery {
            active: Some(true),
            organizer: None,
            category: present(&filters.category).filter(|c| c != ALL),
            search: present(&filters.search),
            day,
            price: PriceFilter::parse(filters.price.as_deref()),
            location: present(&filters.location),
            sort: SortKey::parse(filters.sort_by.as_deref()),
        })
    }

    /// Everything one organizer created, newest first.
    pub fn organized_by(organizer: Uuid, status: StatusFilter) -> Self {
        EventQuery {
            active: status.as_active(),
            organizer: Some(organizer),
            sort: SortKey::Created,
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(active) = self.active {
            if event.is_active != active {
                return false;
            }
        }
        if let Some(organizer) = self.organizer {
            if event.organizer_id != organizer {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if event.category.as_str() != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !contains_ci(&event.title, search) && !contains_ci(&event.description, search) {
                return false;
            }
        }
        if let Some(day) = &self.day {
            if !day.contains(event.date) {
                return false;
            }
        }
        if !self.price.matches(event.price) {
            return false;
        }
        if let Some(location) = &self.location {
            if !contains_ci(&event.location.address, location) {
                return false;
            }
        }
        true
    }

    pub fn compare(&self, a: &Event, b: &Event) -> Ordering {
        self.sort.compare(a, b)
    }

    /// Stable textual form, used for cache keys.
    pub fn canonical(&self) -> String {
        let price = match self.price {
            PriceFilter::Any => "",
            PriceFilter::Free => "free",
            PriceFilter::Paid => "paid",
        };
        let pairs = [
            ("active", self.active.map(|a| a.to_string()).unwrap_or_default()),
            ("organizer", self.organizer.map(|o| o.to_string()).unwrap_or_default()),
            ("category", self.category.clone().unwrap_or_default()),
            ("search", self.search.clone().unwrap_or_default()),
            ("day", self.day.map(|d| d.start.date_naive().to_string()).unwrap_or_default()),
            ("price", price.to_string()),
            ("location", self.location.clone().unwrap_or_default()),
            ("sort", self.sort.as_str().to_string()),
        ];
        serde_urlencoded::to_string(&pairs[..]).unwrap_or_default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Escapes `%`, `_` and `\` for use inside an `ILIKE ... ESCAPE '\'` pattern.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
