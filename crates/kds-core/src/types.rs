//! Core identifiers and value types
//!
//! Defines the small vocabulary shared by every module:
//! - Tenant and order identifiers
//! - Kitchen stations
//! - Order priority
//! - Date ranges for reporting

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Owning tenant of a set of orders
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessId(String);

impl BusinessId {
    /// Create a business id, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::MissingField("businessId"));
        }
        Ok(Self(id))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned order identifier (opaque)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderRecordId(pub String);

impl OrderRecordId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Business-visible order token, generated client-side at creation time
///
/// ULID keeps tokens unique and roughly sortable by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderToken(pub Ulid);

impl OrderToken {
    /// Generate a fresh token
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for OrderToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kitchen work area an order is routed to
///
/// The known set is what the console renders; anything else is carried
/// through untouched as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Station {
    Grill,
    Salad,
    Pizza,
    Dessert,
    Beverage,
    Appetizer,
    Other(String),
}

impl Station {
    /// Stations the console knows how to display
    pub const KNOWN: [Station; 6] = [
        Station::Grill,
        Station::Salad,
        Station::Pizza,
        Station::Dessert,
        Station::Beverage,
        Station::Appetizer,
    ];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Station::Grill => "grill",
            Station::Salad => "salad",
            Station::Pizza => "pizza",
            Station::Dessert => "dessert",
            Station::Beverage => "beverage",
            Station::Appetizer => "appetizer",
            Station::Other(name) => name,
        }
    }

    /// Whether this station belongs to the fixed display vocabulary
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Station::Other(_))
    }
}

impl From<String> for Station {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "grill" => Station::Grill,
            "salad" => Station::Salad,
            "pizza" => Station::Pizza,
            "dessert" => Station::Dessert,
            "beverage" => Station::Beverage,
            "appetizer" => Station::Appetizer,
            _ => Station::Other(value),
        }
    }
}

impl From<Station> for String {
    fn from(value: Station) -> Self {
        match value {
            Station::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Station {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError::MissingField("station"));
        }
        Ok(Station::from(s.to_string()))
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Order priority, 1 (low) to 4 (urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const LOW: Priority = Priority(1);
    pub const NORMAL: Priority = Priority(2);
    pub const HIGH: Priority = Priority(3);
    pub const URGENT: Priority = Priority(4);

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (1..=4).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidPriority(value))
        }
    }

    #[inline]
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "low",
            2 => "normal",
            3 => "high",
            _ => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::LOW
    }
}

impl TryFrom<u8> for Priority {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

/// Reporting window, start inclusive and end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range; `end` must not precede `start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `hours` leading up to `now`
    #[must_use]
    pub fn trailing_hours(now: DateTime<Utc>, hours: u32) -> Self {
        Self {
            start: now - chrono::Duration::hours(i64::from(hours)),
            end: now,
        }
    }

    /// Window length in hours, full precision
    #[must_use]
    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 3_600_000.0
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}
