//! Order record as stored in the search index and cached in Redis.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of `trade_order`, joined with the user's code and nickname.
///
/// Field names are PascalCase on the wire. Amounts travel as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TradeOrder {
    pub trade_no: String,
    pub user_id: String,
    pub user_code: String,
    pub nickname: String,
    pub subject: String,
    #[serde(with = "amount")]
    pub total_amount: f64,
    #[serde(with = "amount")]
    pub discount_amount: f64,
    #[serde(with = "amount")]
    pub payment_amount: f64,
    #[serde(with = "local_time")]
    pub expire_time: Option<NaiveDateTime>,
    pub trade_status: i32,
    #[serde(with = "local_time")]
    pub create_time: Option<NaiveDateTime>,
    pub create_user: String,
    #[serde(with = "local_time")]
    pub update_time: Option<NaiveDateTime>,
    pub update_user: String,
    pub deleted: i32,
}

/// Decimal amounts encoded as JSON strings; numbers are accepted on input.
mod amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) if s.trim().is_empty() => Ok(0.0),
            Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS` timestamps; RFC 3339 is accepted on input.
mod local_time {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.collect_str(&t.format(FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveDateTime::parse_from_str(s, FORMAT)
                .or_else(|_| DateTime::parse_from_rfc3339(s).map(|t| t.naive_local()))
                .map(Some)
                .map_err(de::Error::custom),
        }
    }
}
