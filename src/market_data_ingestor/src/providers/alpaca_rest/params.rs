use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    models::{
        request_params::{BarsRequestParams, ProviderParams},
        timeframe::{TimeFrame, TimeFrameUnit},
    },
    providers::{ProviderError, ValidationSnafu},
};

/// Specifies the corporate action adjustment for stock data.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    #[default]
    Raw,
    Split,
    Dividend,
    All,
}

impl Adjustment {
    fn as_str(self) -> &'static str {
        match self {
            Adjustment::Raw => "raw",
            Adjustment::Split => "split",
            Adjustment::Dividend => "dividend",
            Adjustment::All => "all",
        }
    }
}

/// Specifies the source feed for stock data.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    #[default]
    Sip,
    Iex,
    Otc,
}

impl Feed {
    fn as_str(self) -> &'static str {
        match self {
            Feed::Sip => "sip",
            Feed::Iex => "iex",
            Feed::Otc => "otc",
        }
    }
}

/// Specifies the sort order for the bars.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    #[default]
    Asc,
    Desc,
}

impl Sort {
    fn as_str(self) -> &'static str {
        match self {
            Sort::Asc => "asc",
            Sort::Desc => "desc",
        }
    }
}

/// Alpaca-specific parameters for a bars request.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AlpacaBarsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<Adjustment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<Feed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

/// Checks the amount/unit combinations Alpaca accepts.
pub fn validate_timeframe(timeframe: &TimeFrame) -> Result<(), ProviderError> {
    let amount = timeframe.amount;
    match timeframe.unit {
        TimeFrameUnit::Minute => ensure!(
            (1..=59).contains(&amount),
            ValidationSnafu {
                message: "Minute units can only be used with amounts between 1-59",
            }
        ),
        TimeFrameUnit::Hour => ensure!(
            (1..=23).contains(&amount),
            ValidationSnafu {
                message: "Hour units can only be used with amounts 1-23",
            }
        ),
        TimeFrameUnit::Day | TimeFrameUnit::Week => ensure!(
            amount == 1,
            ValidationSnafu {
                message: "Day and Week units can only be used with amount 1",
            }
        ),
        TimeFrameUnit::Month => ensure!(
            [1, 2, 3, 6, 12].contains(&amount),
            ValidationSnafu {
                message: "Month units can only be used with amount 1, 2, 3, 6 and 12",
            }
        ),
    }
    Ok(())
}

/// Builds the query string pairs for one page of a bars request.
pub fn construct_params(params: &BarsRequestParams) -> Vec<(String, String)> {
    let mut query = vec![
        ("symbols".to_string(), params.symbols.join(",")),
        ("timeframe".to_string(), params.timeframe.to_string()),
        ("start".to_string(), params.start.to_rfc3339()),
        ("end".to_string(), params.end.to_rfc3339()),
    ];

    if let ProviderParams::Alpaca(extra) = &params.provider_specific {
        if let Some(adjustment) = extra.adjustment {
            query.push(("adjustment".to_string(), adjustment.as_str().to_string()));
        }
        if let Some(feed) = extra.feed {
            query.push(("feed".to_string(), feed.as_str().to_string()));
        }
        if let Some(currency) = &extra.currency {
            query.push(("currency".to_string(), currency.clone()));
        }
        if let Some(limit) = extra.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(sort) = extra.sort {
            query.push(("sort".to_string(), sort.as_str().to_string()));
        }
    }

    query
}
