//! HTTP transport for one run: posts the request and pumps the response body
//! into the shared run state under the heartbeat watchdog.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use playground_api::RunRequest;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::client::Shared;
use crate::run_state::RunId;
use crate::watchdog::Watchdog;

/// Drive a single run to its end.
///
/// Every event is handed to the state together with `run_id`; as soon as the
/// state reports the run ended or no longer current, the response is dropped,
/// which closes the connection.
pub(crate) async fn drive(
    shared: Arc<Shared>,
    http: reqwest::Client,
    url: Url,
    request: RunRequest,
    run_id: RunId,
    heartbeat: Duration,
) {
    let mut watchdog = Watchdog::arm(heartbeat);

    let send = http
        .post(url)
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json")
        .json(&request)
        .send();

    let response = match watchdog.guard(send).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            tracing::error!(%run_id, "connection error: {}", err);
            shared.apply(|state| state.on_error(run_id));
            return;
        }
        Err(_) => {
            tracing::warn!(%run_id, timeout = ?heartbeat, "no response from server");
            shared.apply(|state| state.on_timeout(run_id));
            return;
        }
    };

    watchdog.heartbeat();
    let status = response.status().as_u16();
    tracing::debug!(%run_id, status, "response opened");
    if shared
        .apply(|state| state.on_response(run_id, status))
        .is_done()
    {
        return;
    }

    let mut body = response.bytes_stream();
    loop {
        match watchdog.guard(body.next()).await {
            Ok(Some(Ok(chunk))) => {
                watchdog.heartbeat();
                tracing::trace!(%run_id, bytes = chunk.len(), "chunk");
                if shared
                    .apply(|state| state.on_chunk(run_id, &chunk))
                    .is_done()
                {
                    return;
                }
            }
            Ok(Some(Err(err))) => {
                tracing::error!(%run_id, "connection error while streaming: {}", err);
                shared.apply(|state| state.on_error(run_id));
                return;
            }
            Ok(None) => {
                tracing::debug!(%run_id, "response closed");
                shared.apply(|state| state.on_close(run_id));
                return;
            }
            Err(_) => {
                tracing::warn!(%run_id, timeout = ?heartbeat, "server response timed out");
                // Abort the transport before reporting
                drop(body);
                shared.apply(|state| state.on_timeout(run_id));
                return;
            }
        }
    }
}
