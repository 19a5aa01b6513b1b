use tracing::info;

use super::interner::StringInterner;
use super::tables::ClientTable;

/// Outcome of the admission-time rate check for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCheck {
    Ok,
    /// Client crossed the threshold with this query or is still limited.
    Limited,
}

/// Count one query against the client's window. The flag is sticky until a
/// window reset finds the client back under the threshold.
pub(crate) fn account_query(
    clients: &mut ClientTable,
    interner: &StringInterner,
    client_idx: usize,
    limit: u32,
) -> RateCheck {
    if limit == 0 {
        return RateCheck::Ok;
    }
    let Some(client) = clients.get_mut(client_idx) else {
        return RateCheck::Ok;
    };

    client.rate_limit_count += 1;

    if client.flags.rate_limited {
        return RateCheck::Limited;
    }

    if client.rate_limit_count > limit {
        client.flags.rate_limited = true;
        info!(
            client = interner.get(client.ip_id),
            count = client.rate_limit_count,
            limit,
            "Rate-limiting client"
        );
        return RateCheck::Limited;
    }

    RateCheck::Ok
}

/// Window rollover: clear every client's counter. Clients that accrued more
/// than the threshold during the closing window stay limited into the next
/// one.
pub(crate) fn reset_windows(clients: &mut ClientTable, interner: &StringInterner, limit: u32) {
    for client in clients.iter_mut() {
        if client.flags.rate_limited {
            let ip = interner.get(client.ip_id);
            if client.rate_limit_count > limit {
                info!(
                    client = ip,
                    count = client.rate_limit_count,
                    "Still rate-limiting client, it kept making additional queries"
                );
            } else {
                info!(client = ip, "Ending rate-limitation of client");
                client.flags.rate_limited = false;
            }
        }
        client.rate_limit_count = 0;
    }
}

/// Remaining seconds until the client's limitation can end. A client that
/// overran the window `k` times over sits out `k` whole windows.
pub fn turnaround(rate_limit_count: u32, limit: u32, interval: u64, elapsed: i64) -> i64 {
    if limit == 0 {
        return 0;
    }
    let how_often = (rate_limit_count / limit) as i64;
    (interval as i64 * how_often - elapsed).max(0)
}
