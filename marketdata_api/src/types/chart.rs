use serde::Deserialize;

/// Top-level envelope of a `/v8/finance/chart` response.
#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: Option<ChartNode>,
}

#[derive(Debug, Deserialize)]
pub struct ChartNode {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: Option<MetaNode>,
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaNode {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_timezone_name: Option<String>,
    #[serde(default)]
    pub gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteBlock>,
    #[serde(default)]
    pub adjclose: Vec<AdjCloseBlock>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteBlock {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjCloseBlock {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

impl ChartResult {
    /// Pairs each bar timestamp with its close. Bars the provider left null
    /// stay `None`; timestamps without a matching close are dropped.
    pub fn closes(&self) -> Vec<(i64, Option<f64>)> {
        let timestamps = self.timestamp.as_deref().unwrap_or(&[]);
        let closes = self
            .indicators
            .quote
            .first()
            .map(|q| q.close.as_slice())
            .unwrap_or(&[]);
        timestamps
            .iter()
            .zip(closes.iter())
            .map(|(ts, close)| (*ts, *close))
            .collect()
    }

    /// Like [`closes`](Self::closes), but each bar takes the split and
    /// dividend adjusted close when the provider sent one and falls back to
    /// the raw close otherwise.
    pub fn adjusted_closes(&self) -> Vec<(i64, Option<f64>)> {
        let adjusted = self
            .indicators
            .adjclose
            .first()
            .map(|a| a.adjclose.as_slice())
            .unwrap_or(&[]);
        self.closes()
            .into_iter()
            .enumerate()
            .map(|(i, (ts, close))| (ts, adjusted.get(i).copied().flatten().or(close)))
            .collect()
    }

    /// Exchange offset from UTC in seconds, zero when the meta block is missing.
    pub fn gmt_offset(&self) -> i64 {
        self.meta
            .as_ref()
            .and_then(|m| m.gmtoffset)
            .unwrap_or_default()
    }
}
