use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryLogParams {
    pub from: Option<f64>,
    pub until: Option<f64>,
    pub domain: Option<String>,
    pub client: Option<String>,
    pub upstream: Option<String>,
    #[serde(rename = "type")]
    pub qtype: Option<String>,
    pub status: Option<String>,
    pub reply: Option<String>,
    pub dnssec: Option<String>,
    pub cursor: Option<i64>,
    pub start: Option<u64>,
    pub length: Option<i64>,
    pub draw: Option<i64>,
    pub disk: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReplyInfo {
    #[serde(rename = "type")]
    pub reply_type: &'static str,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryClientInfo {
    pub ip: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryItem {
    pub id: i64,
    pub time: f64,
    #[serde(rename = "type")]
    pub qtype: &'static str,
    pub status: &'static str,
    pub dnssec: &'static str,
    pub domain: String,
    pub upstream: Option<String>,
    pub reply: QueryReplyInfo,
    pub client: QueryClientInfo,
    pub ttl: i64,
    pub regex_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryLogResponse {
    pub queries: Vec<QueryItem>,
    pub cursor: Option<i64>,
    #[serde(rename = "recordsTotal")]
    pub records_total: u64,
    #[serde(rename = "recordsFiltered")]
    pub records_filtered: u64,
    pub draw: i64,
    pub took: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionsParams {
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionValues {
    pub domain: Vec<String>,
    pub client: Vec<String>,
    pub upstream: Vec<String>,
    #[serde(rename = "type")]
    pub qtype: Vec<&'static str>,
    pub status: Vec<&'static str>,
    pub reply: Vec<&'static str>,
    pub dnssec: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: SuggestionValues,
    pub took: f64,
}
