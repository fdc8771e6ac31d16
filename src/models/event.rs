use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Music,
    Sports,
    Business,
    Arts,
    Food,
    Health,
    Technology,
    Education,
    Entertainment,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Music,
        Category::Sports,
        Category::Business,
        Category::Arts,
        Category::Food,
        Category::Health,
        Category::Technology,
        Category::Education,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Music => "Music",
            Category::Sports => "Sports",
            Category::Business => "Business",
            Category::Arts => "Arts",
            Category::Food => "Food",
            Category::Health => "Health",
            Category::Technology => "Technology",
            Category::Education => "Education",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Stored but not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Persisted event record. `organizer_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub location: Location,
    pub category: Category,
    pub image: String,
    pub price: f64,
    pub organizer_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated field values for a new event, organizer excluded.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub location: Location,
    pub category: Category,
    pub image: String,
    pub price: f64,
}

impl Event {
    pub fn create(data: NewEvent, organizer_id: Uuid) -> Self {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            date: data.date,
            time: data.time,
            location: data.location,
            category: data.category,
            image: data.image,
            price: data.price,
            organizer_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: &EventChanges) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(date) = changes.date {
            self.date = date;
        }
        if let Some(time) = &changes.time {
            self.time = time.clone();
        }
        if let Some(location) = &changes.location {
            self.location = location.clone();
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(image) = &changes.image {
            self.image = image.clone();
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub location: Option<Location>,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub is_active: Option<bool>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.image.is_none()
            && self.price.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Event as returned to readers: organizer populated, `is_saved` computed
/// per request from the caller's saved list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub location: Location,
    pub category: Category,
    pub image: String,
    pub price: f64,
    pub organizer: Option<OrganizerSummary>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_saved: bool,
}

impl EventView {
    pub fn new(event: Event, organizer: Option<OrganizerSummary>) -> Self {
        EventView {
            id: event.id,
            title: event.title,
            description: event.description,
            date: event.date,
            time: event.time,
            location: event.location,
            category: event.category,
            image: event.image,
            price: event.price,
            organizer,
            is_active: event.is_active,
            created_at: event.created_at,
            updated_at: event.updated_at,
            is_saved: false,
        }
    }

    pub fn with_saved(mut self, saved: &[Uuid]) -> Self {
        self.is_saved = saved.contains(&self.id);
        self
    }

    pub fn organizer_id(&self) -> Option<Uuid> {
        self.organizer.as_ref().map(|o| o.id)
    }
}
