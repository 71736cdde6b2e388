use std::time::Duration;

use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, IF_MODIFIED_SINCE, IF_NONE_MATCH},
};
use url::Url;

use crate::{
    error::MonitorError,
    state::{FetchState, Validators, http_date},
};

const FEED_ACCEPT: &str =
    "application/atom+xml, application/rss+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5";

/// Result of a successful conditional GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered 304.
    NotModified,
    /// The server returned a body.
    Modified {
        /// Raw response body
        body: Vec<u8>,
        /// Validators to send on the next request
        validators: Validators,
    },
}

/// GET `url`, sending the validators stored in `state`.
pub async fn conditional_get(
    client: &Client,
    url: &Url,
    state: &FetchState,
    timeout: Duration,
) -> Result<FetchOutcome, MonitorError> {
    let mut request = client.get(url.clone()).timeout(timeout).header(ACCEPT, FEED_ACCEPT);
    if let Some(etag) = &state.etag {
        request = request.header(IF_NONE_MATCH, etag);
    }
    if let Some(ts) = state.last_modified {
        request = request.header(IF_MODIFIED_SINCE, http_date(ts));
    }

    let resp = request.send().await.map_err(MonitorError::Network)?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        return Ok(FetchOutcome::NotModified);
    }
    if !status.is_success() {
        return Err(MonitorError::Http { status });
    }

    let validators = Validators::from_headers(resp.headers());
    let body = resp.bytes().await.map_err(MonitorError::Network)?;
    Ok(FetchOutcome::Modified { body: body.to_vec(), validators })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::{Matcher, Server};

    fn feed_url(server: &Server) -> Url {
        Url::parse(&format!("{}/history.atom", server.url())).unwrap()
    }

    #[tokio::test]
    async fn first_request_carries_no_validators() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/history.atom")
            .match_header("if-none-match", Matcher::Missing)
            .match_header("if-modified-since", Matcher::Missing)
            .with_status(200)
            .with_header("etag", "\"v1\"")
            .with_header("last-modified", "Mon, 03 Nov 2025 14:32:00 GMT")
            .with_body("<feed/>")
            .create_async()
            .await;

        let outcome = conditional_get(
            &Client::new(),
            &feed_url(&server),
            &FetchState::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        let FetchOutcome::Modified { body, validators } = outcome else {
            panic!("expected a body, got {outcome:?}");
        };
        assert_eq!(body, b"<feed/>");
        assert_eq!(validators.etag.as_deref(), Some("\"v1\""));
        assert_eq!(
            validators.last_modified,
            Some(Utc.with_ymd_and_hms(2025, 11, 3, 14, 32, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn stored_validators_are_sent_and_304_is_not_modified() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/history.atom")
            .match_header("if-none-match", "\"v1\"")
            .match_header("if-modified-since", "Mon, 03 Nov 2025 14:32:00 GMT")
            .with_status(304)
            .create_async()
            .await;

        let state = FetchState {
            etag: Some("\"v1\"".to_owned()),
            last_modified: Some(Utc.with_ymd_and_hms(2025, 11, 3, 14, 32, 0).unwrap()),
            ..FetchState::default()
        };
        let outcome =
            conditional_get(&Client::new(), &feed_url(&server), &state, Duration::from_secs(5))
                .await
                .unwrap();

        mock.assert_async().await;
        assert_eq!(outcome, FetchOutcome::NotModified);
    }

    #[tokio::test]
    async fn non_success_status_is_an_http_error() {
        let mut server = Server::new_async().await;
        let _mock = server.mock("GET", "/history.atom").with_status(503).create_async().await;

        let err = conditional_get(
            &Client::new(),
            &feed_url(&server),
            &FetchState::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MonitorError::Http { status } if status.as_u16() == 503));
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let url = Url::parse("http://127.0.0.1:9/history.atom").unwrap();
        let err =
            conditional_get(&Client::new(), &url, &FetchState::default(), Duration::from_secs(2))
                .await
                .unwrap_err();
        assert_eq!(err.kind(), "network");
    }
}
