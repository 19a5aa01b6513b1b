use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct StatsSummaryResponse {
    pub queries: StatsQueries,
    pub clients: StatsClients,
    pub took: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsQueries {
    pub total: i64,
    pub blocked: i64,
    pub percent_blocked: f64,
    pub cached: i64,
    pub forwarded: i64,
    pub unique_domains: usize,
    pub types: BTreeMap<&'static str, i64>,
    pub status: BTreeMap<&'static str, i64>,
    pub replies: BTreeMap<&'static str, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsClients {
    pub active: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: i64,
    pub total: i64,
    pub blocked: i64,
    pub cached: i64,
    pub forwarded: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
    pub took: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientHistoryResponse {
    pub clients: Vec<String>,
    pub timestamps: Vec<i64>,
    /// One series per named client, in the same order.
    pub series: Vec<Vec<i64>>,
    /// Everyone past the top-N cutoff, folded together.
    pub other: Vec<i64>,
    pub took: f64,
}
