use axum::extract::{Query, State};
use axum::{Extension, Json};
use std::str::FromStr;
use tracing::instrument;
use vigil_dns_application::ports::QueryLogFilters;
use vigil_dns_domain::{DnssecStatus, DomainError, QueryStatus, QueryType, ReplyType};

use crate::dto::{
    QueryClientInfo, QueryItem, QueryLogParams, QueryLogResponse, QueryReplyInfo,
    SuggestionsParams, SuggestionsResponse, SuggestionValues,
};
use crate::errors::{ApiError, RequestTimer};
use crate::state::AppState;

/// Resolve an enum filter string by scanning the canonical forms; unknown
/// values are a client error.
fn resolve<T: FromStr>(
    value: &Option<String>,
    field: &'static str,
    code: impl Fn(&T) -> i64,
) -> Result<Option<i64>, DomainError> {
    match value {
        None => Ok(None),
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => Ok(Some(code(&v))),
            Err(_) => Err(DomainError::InvalidFilter {
                field,
                value: raw.clone(),
            }),
        },
    }
}

fn build_filters(params: &QueryLogParams) -> Result<QueryLogFilters, DomainError> {
    let mut filters = QueryLogFilters::new();
    filters.from = params.from;
    filters.until = params.until;
    filters.domain = params.domain.clone();
    filters.client = params.client.clone();
    filters.upstream = params.upstream.clone();
    filters.qtype = resolve::<QueryType>(&params.qtype, "type", QueryType::code)?;
    filters.status = resolve::<QueryStatus>(&params.status, "status", QueryStatus::code)?;
    filters.reply = resolve::<ReplyType>(&params.reply, "reply", ReplyType::code)?;
    filters.dnssec = resolve::<DnssecStatus>(&params.dnssec, "dnssec", DnssecStatus::code)?;
    filters.cursor = params.cursor;
    filters.start = params.start.unwrap_or(0);
    filters.length = params.length.unwrap_or(100);
    filters.draw = params.draw.unwrap_or(0);
    filters.disk = params.disk.unwrap_or(false);
    Ok(filters)
}

/// GET /api/queries — filtered, cursor-paginated query log.
#[instrument(skip(state, timer), name = "api_get_queries")]
pub async fn get_queries(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
    Query(params): Query<QueryLogParams>,
) -> Result<Json<QueryLogResponse>, ApiError> {
    let filters = build_filters(&params).map_err(|e| ApiError::from_domain(e, &timer))?;

    let page = state
        .query
        .get_log
        .execute(filters)
        .await
        .map_err(|e| ApiError::from_domain(e, &timer))?;

    let queries = page
        .queries
        .into_iter()
        .map(|row| QueryItem {
            id: row.id,
            time: row.timestamp,
            qtype: QueryType::from_code(row.qtype).unwrap_or_default().as_str(),
            status: QueryStatus::from_code(row.status).unwrap_or_default().as_str(),
            dnssec: DnssecStatus::from_code(row.dnssec).unwrap_or_default().as_str(),
            domain: row.domain,
            upstream: row.forward,
            reply: QueryReplyInfo {
                reply_type: ReplyType::from_code(row.reply_type).unwrap_or_default().as_str(),
                time: row.reply_time,
            },
            client: QueryClientInfo {
                ip: row.client,
                name: row.client_name,
            },
            ttl: row.ttl,
            regex_id: row.regex_id,
        })
        .collect();

    Ok(Json(QueryLogResponse {
        queries,
        cursor: page.cursor,
        records_total: page.records_total,
        records_filtered: page.records_filtered,
        draw: page.draw,
        took: timer.took(),
    }))
}

/// GET /api/queries/suggestions — autocomplete values for the log filters.
#[instrument(skip(state, timer), name = "api_get_suggestions")]
pub async fn get_suggestions(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
    Query(params): Query<SuggestionsParams>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let count = params.count.unwrap_or(10);
    let suggestions = state
        .query
        .get_suggestions
        .execute(count)
        .await
        .map_err(|e| ApiError::from_domain(e, &timer))?;

    Ok(Json(SuggestionsResponse {
        suggestions: SuggestionValues {
            domain: suggestions.domains,
            client: suggestions.clients,
            upstream: suggestions.upstreams,
            qtype: suggestions.types,
            status: suggestions.statuses,
            reply: suggestions.replies,
            dnssec: suggestions.dnssec,
        },
        took: timer.took(),
    }))
}
