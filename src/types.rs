use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Key holding the role title inside a `hero.data.sortid[*].data` element.
pub const ROLE_TITLE_KEY: &str = "sort_title";
/// Key holding the lane title inside a `hero.data.roadsort[*].data` element.
pub const LANE_TITLE_KEY: &str = "road_sort_title";

/// A role or lane label attached to a hero by the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub title: String,
}

impl Tag {
    /// Collect tag titles from an upstream tag list: `[{"data": {<key>: "..."}}, ...]`.
    /// Elements without the expected shape are ignored.
    pub fn parse_list(raw: &Value, title_key: &str) -> Vec<Tag> {
        raw.as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("data")?.get(title_key)?.as_str())
                    .map(|title| Tag { title: title.trim().to_string() })
                    .filter(|t| !t.title.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Same as [`Tag::parse_list`] but from the text stored in the table.
    /// Accepts JSON, or the Python list repr used by older tables
    /// (`[{'data': {'sort_title': 'Tank'}}]`). Returns None for anything else.
    pub fn parse_list_text(text: &str, title_key: &str) -> Option<Vec<Tag>> {
        let raw: Value = serde_json::from_str(text)
            .or_else(|_| serde_json::from_str(&python_repr_to_json(text)))
            .ok()?;
        Some(Self::parse_list(&raw, title_key))
    }
}

/// Rewrite a Python literal repr into JSON: single-quoted strings become
/// double-quoted and `None`/`True`/`False` become `null`/`true`/`false`.
fn python_repr_to_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                if escaped != '\'' {
                                    out.push('\\');
                                }
                                out.push(escaped);
                            }
                        }
                        '"' if c == '\'' => out.push_str("\\\""),
                        q if q == c => break,
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_alphanumeric() && next != '_' {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
            }
            other => out.push(other),
        }
    }
    out
}

pub fn join_titles(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| t.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Hero metadata
// ---------------------------------------------------------------------------

/// One hero from the bulk positions endpoint, flattened out of its `data` object.
#[derive(Debug, Clone, PartialEq)]
pub struct HeroPosition {
    pub hero_id: u32,
    pub name: String,
    pub roles: Vec<Tag>,
    pub lanes: Vec<Tag>,
    pub raw_roles: Value,
    pub raw_lanes: Value,
}

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// Rates taken from the final element of a `win_rate` time series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatestRates {
    pub win_rate: Option<f64>,
    pub ban_rate: Option<f64>,
    pub app_rate: Option<f64>,
}

impl LatestRates {
    /// Read the last entry of `payload.win_rate[]`. The last element wins,
    /// regardless of its values. Returns None for an absent or empty series.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let latest = payload.get("win_rate")?.as_array()?.last()?;
        Some(Self {
            win_rate: number_field(latest, "win_rate"),
            ban_rate: number_field(latest, "ban_rate"),
            app_rate: number_field(latest, "app_rate"),
        })
    }

    /// Re-parse the JSON text of a stored payload.
    pub fn from_payload_text(text: &str) -> Option<Self> {
        let payload: Value = serde_json::from_str(text).ok()?;
        Self::from_payload(&payload)
    }
}

/// The API is inconsistent about numbers vs numeric strings.
fn number_field(v: &Value, key: &str) -> Option<f64> {
    v.get(key)
        .and_then(|x| x.as_f64().or_else(|| x.as_str().and_then(|s| s.trim().parse().ok())))
        .filter(|x| x.is_finite())
}

/// The most recent rate record of one hero.
#[derive(Debug, Clone, PartialEq)]
pub struct HeroRateSnapshot {
    pub hero_id: u32,
    pub rates: LatestRates,
    /// Raw `data` object of the latest rate record.
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn last_series_entry_wins() {
        let payload = json!({
            "win_rate": [
                {"win_rate": 0.40, "ban_rate": 0.30, "app_rate": 0.02},
                {"win_rate": 0.52, "ban_rate": 0.10}
            ]
        });
        let rates = LatestRates::from_payload(&payload).expect("series present");
        assert_eq!(rates.win_rate, Some(0.52));
        assert_eq!(rates.ban_rate, Some(0.10));
        assert_eq!(rates.app_rate, None);
    }

    #[test]
    fn empty_series_has_no_rates() {
        assert!(LatestRates::from_payload(&json!({"win_rate": []})).is_none());
        assert!(LatestRates::from_payload(&json!({"other": 1})).is_none());
        assert!(LatestRates::from_payload_text("not json").is_none());
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let rates = LatestRates::from_payload_text(r#"{"win_rate":[{"win_rate":"0.5","ban_rate":"x"}]}"#)
            .expect("series present");
        assert_eq!(rates.win_rate, Some(0.5));
        assert_eq!(rates.ban_rate, None);
    }

    #[test]
    fn tags_skip_malformed_elements() {
        let raw = json!([
            {"data": {"sort_title": "Fighter"}},
            {"data": {}},
            "junk",
            {"data": {"sort_title": "Assassin"}}
        ]);
        let tags = Tag::parse_list(&raw, ROLE_TITLE_KEY);
        assert_eq!(join_titles(&tags), "Fighter, Assassin");
        assert!(Tag::parse_list_text("[{", ROLE_TITLE_KEY).is_none());
    }

    #[test]
    fn python_list_repr_tags_are_read() {
        let text = "[{'data': {'road_sort_title': 'Exp Lane', 'icon': None}}, \
                    {'data': {'road_sort_title': \"Jungle's Edge\", 'hot': True}}]";
        let tags = Tag::parse_list_text(text, LANE_TITLE_KEY).expect("python repr");
        assert_eq!(join_titles(&tags), "Exp Lane, Jungle's Edge");
        assert_eq!(Tag::parse_list_text("[]", LANE_TITLE_KEY), Some(vec![]));
    }
}
