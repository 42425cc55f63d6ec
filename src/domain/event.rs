//! Event records as delivered by the ticketing feed
//!
//! The feed is fetched and parsed by an external collaborator; the engine
//! receives already-deserialized records and is agnostic to transport.

use serde::{Deserialize, Serialize};

/// One event row from the feed.
///
/// Field names mirror the feed's uppercase column headers so records
/// deserialize straight out of the feed payload. Only the identifier and
/// display name are required; everything else degrades to an empty string
/// so a sparse feed still renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    #[serde(rename = "EVENT_ID")]
    pub event_id: String,

    #[serde(rename = "EVENT_NAME")]
    pub event_name: String,

    #[serde(rename = "STARTS_AT", default)]
    pub starts_at: String,

    #[serde(rename = "VENUE_NAME", default)]
    pub venue_name: String,

    #[serde(rename = "CITY_NAME", default)]
    pub city_name: String,

    #[serde(rename = "STATE_CODE", default)]
    pub state_code: String,

    #[serde(rename = "COUNTRY_NAME", default)]
    pub country_name: String,

    /// Large photo used for compositing
    #[serde(rename = "EVENT_IMAGE_LARGE_URL", default)]
    pub event_image_large_url: String,

    /// Small thumbnail, only consumed by picker UIs
    #[serde(rename = "EVENT_IMAGE_SMALL_URL", default)]
    pub event_image_small_url: String,

    #[serde(rename = "EVENT_URL", default)]
    pub event_url: String,

    #[serde(rename = "EVENT_CATEGORY", default)]
    pub event_category: String,

    #[serde(rename = "EVENT_BLURB", default)]
    pub event_blurb: String,

    #[serde(rename = "POPULARITY_SCORE", default)]
    pub popularity_score: String,

    #[serde(rename = "ACTIVE_LISTINGS_COUNT", default)]
    pub active_listings_count: String,

    #[serde(rename = "PREFERRED_URL", default)]
    pub preferred_url: String,
}

impl EventData {
    /// Minimal record for tests and previews
    pub fn sample(id: &str, name: &str) -> Self {
        EventData {
            event_id: id.to_string(),
            event_name: name.to_string(),
            starts_at: String::new(),
            venue_name: String::new(),
            city_name: String::new(),
            state_code: String::new(),
            country_name: String::new(),
            event_image_large_url: String::new(),
            event_image_small_url: String::new(),
            event_url: String::new(),
            event_category: String::new(),
            event_blurb: String::new(),
            popularity_score: String::new(),
            active_listings_count: String::new(),
            preferred_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_feed_row() {
        let raw = r#"{
            "EVENT_ID": "ev-1",
            "EVENT_NAME": "Summer Jam",
            "STARTS_AT": "2025-02-05T20:00:00",
            "CITY_NAME": "Austin",
            "STATE_CODE": "TX",
            "COUNTRY_NAME": "USA",
            "VENUE_NAME": "Main Stage Arena",
            "EVENT_IMAGE_LARGE_URL": "https://img.example.com/ev-1.jpg"
        }"#;

        let event: EventData = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_id, "ev-1");
        assert_eq!(event.state_code, "TX");
        // missing columns default to empty
        assert_eq!(event.event_blurb, "");
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let raw = r#"{ "EVENT_NAME": "No Id" }"#;
        assert!(serde_json::from_str::<EventData>(raw).is_err());
    }
}
