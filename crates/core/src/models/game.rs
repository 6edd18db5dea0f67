use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Item, ItemId};

/// Typed view of a `games` item used by the dashboard.
///
/// Parsing is lenient because the API stores whatever the forms submitted:
/// numbers may arrive as strings, and missing or unreadable numeric fields
/// count as zero without affecting the other fields.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Game {
    #[serde(
        rename = "id_game",
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ItemId>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform: String,
    /// Release year.
    #[serde(default, deserialize_with = "lenient_year")]
    pub released: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub genre: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub developer: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub publisher: String,
    /// Review score, higher is better.
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating: String,
}

impl Game {
    /// Parse a raw item into a game.
    pub fn from_item(item: &Item) -> Result<Self, serde_json::Error> {
        serde_json::from_value(item.clone().into_value())
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<ItemId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ItemId::from_value(&Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => super::value_to_string(&other),
    })
}

fn lenient_number(value: Value) -> f64 {
    let parsed = match &value {
        Value::Null => Some(0.0),
        Value::Number(num) => num.as_f64(),
        Value::String(text) if text.trim().is_empty() => Some(0.0),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.filter(|num| num.is_finite()) {
        Some(num) => num,
        None => {
            debug!(%value, "unreadable number counts as zero");
            0.0
        }
    }
}

fn lenient_year<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(year) = value.as_i64() {
        return Ok(year);
    }
    Ok(lenient_number(value).trunc() as i64)
}

fn lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(Value::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numbers_sent_as_strings() -> Result<(), serde_json::Error> {
        let item = Item::from_value(json!({
            "id_game": 12,
            "name": "Half-Life",
            "platform": "PC",
            "released": "1998",
            "score": "96",
            "rating": "M"
        }))
        .expect("object");

        let game = Game::from_item(&item)?;
        assert_eq!(game.id, Some(ItemId::from(12)));
        assert_eq!(game.released, 1998);
        assert_eq!(game.score, 96.0);
        assert_eq!(game.genre, "");
        Ok(())
    }

    #[test]
    fn missing_numbers_default_to_zero() -> Result<(), serde_json::Error> {
        let item = Item::new().with("name", "Untitled").with("score", "");
        let game = Game::from_item(&item)?;
        assert_eq!(game.released, 0);
        assert_eq!(game.score, 0.0);
        Ok(())
    }

    #[test]
    fn unreadable_numbers_count_as_zero() -> Result<(), serde_json::Error> {
        let item = Item::new()
            .with("name", "Broken")
            .with("released", "soon")
            .with("score", "88");
        let game = Game::from_item(&item)?;
        assert_eq!(game.name, "Broken");
        assert_eq!(game.released, 0);
        assert_eq!(game.score, 88.0);

        let item = Item::new().with("released", 1999).with("score", "N/A");
        let game = Game::from_item(&item)?;
        assert_eq!(game.released, 1999);
        assert_eq!(game.score, 0.0);
        Ok(())
    }
}
