use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::dto::{
    ClientHistoryResponse, HistoryEntry, HistoryResponse, StatsClients, StatsQueries,
    StatsSummaryResponse,
};
use crate::errors::RequestTimer;
use crate::state::AppState;

/// GET /api/stats/summary — live counters of the engine.
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
) -> Json<StatsSummaryResponse> {
    let summary = state.stats.get_stats.execute();

    Json(StatsSummaryResponse {
        queries: StatsQueries {
            total: summary.total,
            blocked: summary.blocked,
            percent_blocked: summary.percent_blocked,
            cached: summary.cached,
            forwarded: summary.forwarded,
            unique_domains: summary.unique_domains,
            types: summary.by_type.into_iter().collect(),
            status: summary.by_status.into_iter().collect(),
            replies: summary.by_reply.into_iter().collect(),
        },
        clients: StatsClients {
            active: summary.unique_clients,
        },
        took: timer.took(),
    })
}

/// GET /api/history — the overtime ring as a JSON series.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
) -> Json<HistoryResponse> {
    let history = state
        .stats
        .get_history
        .execute()
        .into_iter()
        .map(|slot| HistoryEntry {
            timestamp: slot.timestamp,
            total: slot.total,
            blocked: slot.blocked,
            cached: slot.cached,
            forwarded: slot.forwarded,
        })
        .collect();

    Json(HistoryResponse {
        history,
        took: timer.took(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientHistoryParams {
    /// How many clients to break out individually.
    pub n: Option<usize>,
}

/// GET /api/history/clients — per-client overtime columns.
pub async fn get_client_history(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
    Query(params): Query<ClientHistoryParams>,
) -> Json<ClientHistoryResponse> {
    let top = params.n.unwrap_or(10);
    let history = state.stats.get_history.execute_clients(top);

    Json(ClientHistoryResponse {
        clients: history.clients,
        timestamps: history.timestamps,
        series: history.series,
        other: history.other,
        took: timer.took(),
    })
}
