use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::models::bar::Bar;

#[derive(Deserialize, Debug)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
    #[serde(rename = "n")]
    pub trade_count: u64,
    #[serde(rename = "vw")]
    pub vwap: f64,
}

impl From<AlpacaBar> for Bar {
    fn from(ab: AlpacaBar) -> Self {
        Bar {
            timestamp: ab.timestamp,
            open: ab.open,
            high: ab.high,
            low: ab.low,
            close: ab.close,
            volume: ab.volume,
            trade_count: Some(ab.trade_count),
            vwap: Some(ab.vwap),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct AlpacaResponse {
    // Alpaca sends `null` rather than `{}` when no symbol has bars.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bars: IndexMap<String, Vec<AlpacaBar>>,
    pub next_page_token: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<IndexMap<String, Vec<AlpacaBar>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let bars: Option<IndexMap<String, Vec<AlpacaBar>>> = Option::deserialize(deserializer)?;
    Ok(bars.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_and_converts_bars() {
        let body = r#"{
            "bars": {
                "AAPL": [
                    {"t":"2025-01-02T05:00:00Z","o":248.93,"h":249.1,"l":241.82,"c":243.85,"v":55740731,"n":799564,"vw":244.8},
                    {"t":"2025-01-03T05:00:00Z","o":243.36,"h":244.18,"l":241.89,"c":243.36,"v":40244114,"n":550034,"vw":243.3}
                ]
            },
            "next_page_token": "QUFQTHxEfDIwMjUtMDEtMDM="
        }"#;

        let mut page: AlpacaResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("QUFQTHxEfDIwMjUtMDEtMDM="));

        let bars: Vec<Bar> = page
            .bars
            .shift_remove("AAPL")
            .unwrap()
            .into_iter()
            .map(Bar::from)
            .collect();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 243.36);
        assert_eq!(bars[0].trade_count, Some(799564));
    }

    #[test]
    fn null_bars_become_empty_map() {
        let page: AlpacaResponse =
            serde_json::from_str(r#"{"bars": null, "next_page_token": null}"#).unwrap();
        assert!(page.bars.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
