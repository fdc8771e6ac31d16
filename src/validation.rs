//! Request bodies and their field rules. Bodies are trimmed with
//! `normalize` before `validate`; failures flatten to [`FieldError`]s with
//! dotted paths.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::{Category, Coordinates, EventChanges, Location, NewEvent};

pub fn flatten_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_errors("", errors, &mut out);
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn trim(value: &mut Option<String>) {
    if let Some(v) = value {
        let trimmed = v.trim();
        if trimmed.len() != v.len() {
            *v = trimmed.to_string();
        }
    }
}

/// `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_event_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// 24-hour `H:MM` or `HH:MM`.
pub fn is_valid_time(value: &str) -> bool {
    let Some((hours, minutes)) = value.split_once(':') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return false;
    }
    match (hours.parse::<u8>(), minutes.parse::<u8>()) {
        (Ok(h), Ok(m)) => h < 24 && m < 60,
        _ => false,
    }
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    parse_event_date(value)
        .map(|_| ())
        .ok_or_else(|| invalid("date", "Please provide a valid date"))
}

/// Day granularity: any time on the current UTC day is accepted.
fn validate_upcoming_date(value: &str) -> Result<(), ValidationError> {
    let date = parse_event_date(value).ok_or_else(|| invalid("date", "Please provide a valid date"))?;
    if date.date_naive() < Utc::now().date_naive() {
        return Err(invalid("date", "Event date cannot be in the past"));
    }
    Ok(())
}

fn validate_time(value: &str) -> Result<(), ValidationError> {
    if is_valid_time(value) {
        Ok(())
    } else {
        Err(invalid("time", "Please provide a valid time (HH:MM format)"))
    }
}

fn validate_category(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Category>()
        .map(|_| ())
        .map_err(|_| invalid("category", "Please select a valid category"))
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("address", "Event address cannot be empty"))
    } else {
        Ok(())
    }
}

fn validate_password_strength(value: &str) -> Result<(), ValidationError> {
    let lower = value.chars().any(|c| c.is_ascii_lowercase());
    let upper = value.chars().any(|c| c.is_ascii_uppercase());
    let digit = value.chars().any(|c| c.is_ascii_digit());
    if lower && upper && digit {
        Ok(())
    } else {
        Err(invalid(
            "password",
            "Password must contain at least one lowercase letter, one uppercase letter, and one number",
        ))
    }
}

// --- events ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    #[validate(
        required(message = "Event address is required"),
        custom(function = "validate_not_blank")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl LocationInput {
    fn into_location(self) -> Location {
        Location {
            address: self.address.unwrap_or_default(),
            coordinates: self.coordinates,
        }
    }
}

impl From<Location> for LocationInput {
    fn from(location: Location) -> Self {
        LocationInput {
            address: Some(location.address),
            coordinates: location.coordinates,
        }
    }
}

/// Body of `POST /events`. Any organizer field in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(
        required(message = "Event title is required"),
        length(min = 3, max = 100, message = "Title must be between 3 and 100 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Event description is required"),
        length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters")
    )]
    pub description: Option<String>,
    #[validate(
        required(message = "Event date is required"),
        custom(function = "validate_upcoming_date")
    )]
    pub date: Option<String>,
    #[validate(
        required(message = "Event time is required"),
        custom(function = "validate_time")
    )]
    pub time: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub location: LocationInput,
    #[validate(
        required(message = "Please select a valid category"),
        custom(function = "validate_category")
    )]
    pub category: Option<String>,
    #[validate(
        required(message = "Event image is required"),
        url(message = "Event image must be a valid URL")
    )]
    pub image: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl CreateEventRequest {
    pub fn normalize(mut self) -> Self {
        trim(&mut self.title);
        trim(&mut self.description);
        trim(&mut self.time);
        trim(&mut self.image);
        trim(&mut self.location.address);
        self
    }

    /// Normalizes, validates, and converts into storable values.
    pub fn into_new_event(self) -> ApiResult<NewEvent> {
        let request = self.normalize();
        request.validate()?;

        let missing = |field: &str| ApiError::Validation(vec![FieldError::new(field, "Field is required")]);
        let date = request
            .date
            .as_deref()
            .and_then(parse_event_date)
            .ok_or_else(|| missing("date"))?;
        let category = request
            .category
            .as_deref()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| missing("category"))?;

        Ok(NewEvent {
            title: request.title.ok_or_else(|| missing("title"))?,
            description: request.description.ok_or_else(|| missing("description"))?,
            date,
            time: request.time.ok_or_else(|| missing("time"))?,
            location: request.location.into_location(),
            category,
            image: request.image.ok_or_else(|| missing("image"))?,
            price: request.price.unwrap_or(0.0),
        })
    }
}

/// Body of `PUT /events/{id}`: any subset of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(custom(function = "validate_date"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[validate(custom(function = "validate_time"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationInput>,
    #[validate(custom(function = "validate_category"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[validate(url(message = "Event image must be a valid URL"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateEventRequest {
    pub fn normalize(mut self) -> Self {
        trim(&mut self.title);
        trim(&mut self.description);
        trim(&mut self.time);
        trim(&mut self.image);
        if let Some(location) = self.location.as_mut() {
            trim(&mut location.address);
        }
        self
    }

    pub fn into_changes(self) -> ApiResult<EventChanges> {
        let request = self.normalize();
        request.validate()?;

        Ok(EventChanges {
            title: request.title,
            description: request.description,
            date: request.date.as_deref().and_then(parse_event_date),
            time: request.time,
            location: request.location.map(LocationInput::into_location),
            category: request.category.as_deref().and_then(|c| c.parse().ok()),
            image: request.image,
            price: request.price,
            is_active: request.is_active,
        })
    }
}

// --- auth ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 2, max = 50, message = "Name must be between 2 and 50 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Please provide a valid email"),
        email(message = "Please provide a valid email")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Password must be at least 6 characters long"),
        length(min = 6, message = "Password must be at least 6 characters long"),
        custom(function = "validate_password_strength")
    )]
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn normalize(mut self) -> Self {
        trim(&mut self.name);
        self.email = self.email.map(|e| e.trim().to_lowercase());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "Please provide a valid email"),
        email(message = "Please provide a valid email")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Password is required"),
        length(min = 1, message = "Password is required")
    )]
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn normalize(mut self) -> Self {
        self.email = self.email.map(|e| e.trim().to_lowercase());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UpdateProfileRequest {
    pub fn normalize(mut self) -> Self {
        trim(&mut self.name);
        self
    }
}
