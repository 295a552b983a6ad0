use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// Identifier assigned by the store when a document is created.
pub type DocumentId = String;

/// Sentinel used in both `open` and `close` on days without service.
pub const CLOSED: &str = "Closed";

/// Weekday keys in display order.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Library,
    Cafe,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Library => "library",
            Category::Cafe => "cafe",
            Category::Other(value) => value,
        }
    }

    /// SF Symbol name drawn inside the map marker.
    pub fn marker_symbol(&self) -> &'static str {
        match self {
            Category::Cafe => "cup.and.saucer.fill",
            Category::Library | Category::Other(_) => "book.fill",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other(String::new())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "library" => Category::Library,
            "cafe" => Category::Cafe,
            _ => Category::Other(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for Category {
    fn schema_name() -> String {
        "Category".to_string()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Comment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    /// RFC 3339 on the wire. Absent on comments imported without one.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpeningHours {
    pub open: String,
    pub close: String,
}

impl OpeningHours {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.open.eq_ignore_ascii_case(CLOSED) || self.close.eq_ignore_ascii_case(CLOSED)
    }
}

/// Environmental and amenity descriptors. Keys carry no schema: a missing
/// key means the value is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvFactor {
    pub dynamic_data: BTreeMap<String, f64>,
    pub static_data: BTreeMap<String, f64>,
    pub atmosphere: Vec<String>,
}

impl EnvFactor {
    pub fn crowdedness(&self) -> Option<f64> {
        self.dynamic_data.get("crowdedness").copied()
    }

    pub fn noise(&self) -> Option<f64> {
        self.dynamic_data.get("noise").copied()
    }
}

/// A study location as stored in the `study_locations` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StudyLocation {
    pub name: String,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: f64,
    pub category: Category,
    pub images: Vec<String>,
    pub comments: Vec<Comment>,
    pub hours: BTreeMap<String, OpeningHours>,
    #[serde(rename = "envFactors")]
    pub env_factors: EnvFactor,
}

impl StudyLocation {
    /// Hours for `weekday`, or `None` when the schedule does not mention it.
    pub fn hours_on(&self, weekday: &str) -> Option<&OpeningHours> {
        self.hours.get(weekday)
    }
}

/// A location read back from the store together with its document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoredLocation {
    pub id: DocumentId,
    #[serde(flatten)]
    pub location: StudyLocation,
}
