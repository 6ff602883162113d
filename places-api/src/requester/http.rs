//! Upstream places provider over HTTP.

use std::error::Error as StdError;
use std::io;

use async_trait::async_trait;
use places_core::{Place, RequestContext, Requester, SearchError, SearchParams, SearchResult};
use reqwest::StatusCode;
use serde::Deserialize;

const TYPE_CITY: &str = "city";

/// One element of the upstream JSON array. Only the fields mapped onto a
/// [`Place`] are read; missing or null ones become empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamPlace {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    name: Option<String>,
    country_name: Option<String>,
    city_name: Option<String>,
}

impl From<UpstreamPlace> for Place {
    fn from(upstream: UpstreamPlace) -> Self {
        let subtitle = match upstream.kind.as_deref() {
            Some(TYPE_CITY) => upstream.country_name,
            _ => upstream.city_name,
        };
        Place {
            identifier: upstream.code.unwrap_or_default(),
            title: upstream.name.unwrap_or_default(),
            subtitle: subtitle.unwrap_or_default(),
        }
    }
}

/// Query pairs in the order the upstream expects: locale, term, then one
/// `types[]` per filter.
fn query_pairs(params: &SearchParams) -> Vec<(&'static str, &str)> {
    let mut pairs = Vec::with_capacity(params.types.len() + 2);
    pairs.push(("locale", params.locale.as_str()));
    pairs.push(("term", params.term.as_str()));
    pairs.extend(params.types.iter().map(|t| ("types[]", t.as_str())));
    pairs
}

#[derive(Debug, Clone)]
pub struct HttpRequester {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRequester {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(
        &self,
        ctx: &RequestContext,
        params: &SearchParams,
    ) -> reqwest::RequestBuilder {
        let builder = self.client.get(&self.endpoint).query(&query_pairs(params));
        match ctx.remaining() {
            Some(remaining) => builder.timeout(remaining),
            None => builder,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> SearchResult<Vec<Place>> {
        let response = request.send().await.map_err(classify_transport)?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => {
                return Err(SearchError::client_fault("upstream rejected the query"))
            }
            status => return Err(SearchError::UnexpectedStatus(status.as_u16())),
        }

        let places: Vec<UpstreamPlace> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::DeadlineExceeded
            } else {
                SearchError::unexpected(format!("decode body: {e}"))
            }
        })?;

        Ok(places.into_iter().map(Place::from).collect())
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn request(
        &self,
        ctx: &RequestContext,
        params: &SearchParams,
    ) -> SearchResult<Vec<Place>> {
        let request = self.build_request(ctx, params);
        ctx.run(self.send(request)).await
    }
}

/// Map a transport failure onto the search taxonomy.
fn classify_transport(err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        return SearchError::DeadlineExceeded;
    }
    classify_chain(&err).unwrap_or_else(|| SearchError::unexpected(format!("do request: {err}")))
}

/// Walk `err` and its sources looking for a timeout or a cancellation,
/// however deeply the transport wrapped it.
pub(crate) fn classify_chain(err: &(dyn StdError + 'static)) -> Option<SearchError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(search) = e.downcast_ref::<SearchError>() {
            if matches!(search, SearchError::DeadlineExceeded | SearchError::Cancelled) {
                return Some(search.clone());
            }
        }
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::TimedOut {
                return Some(SearchError::DeadlineExceeded);
            }
        }

        let message = e.to_string().to_lowercase();
        if message.contains("timed out") || message.contains("deadline") {
            return Some(SearchError::DeadlineExceeded);
        }
        if message.contains("canceled") || message.contains("cancelled") {
            return Some(SearchError::Cancelled);
        }

        current = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::RawQuery;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::Router;
    use places_test_utils::{moscow, UPSTREAM_MOSCOW_JSON};

    use super::*;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v2/places.json")
    }

    fn requester(endpoint: String) -> HttpRequester {
        HttpRequester::new(reqwest::Client::new(), endpoint)
    }

    #[test]
    fn test_city_subtitle_is_country() {
        let place = Place::from(UpstreamPlace {
            kind: Some("city".into()),
            code: Some("MOW".into()),
            name: Some("Moscow".into()),
            country_name: Some("Russia".into()),
            city_name: Some("ignored".into()),
        });
        assert_eq!(place, moscow());
    }

    #[test]
    fn test_airport_subtitle_is_city() {
        let place = Place::from(UpstreamPlace {
            kind: Some("airport".into()),
            code: Some("SVO".into()),
            name: Some("Sheremetyevo".into()),
            country_name: Some("Russia".into()),
            city_name: Some("Moscow".into()),
        });
        assert_eq!(place, Place::new("SVO", "Sheremetyevo", "Moscow"));
    }

    #[test]
    fn test_decode_tolerates_nulls_and_extra_fields() {
        let decoded: Vec<UpstreamPlace> =
            serde_json::from_str(r#"[{"type":"airport","code":"XXX","name":null,"weight":3}]"#)
                .unwrap();
        let places: Vec<Place> = decoded.into_iter().map(Place::from).collect();
        assert_eq!(places, vec![Place::new("XXX", "", "")]);

        let fixture: Vec<UpstreamPlace> = serde_json::from_str(UPSTREAM_MOSCOW_JSON).unwrap();
        assert_eq!(Place::from(fixture.into_iter().next().unwrap()), moscow());
    }

    #[test]
    fn test_query_encoding() {
        let params = SearchParams::new("Москва", "ru")
            .with_type("city")
            .with_type("airport");
        let request = requester("http://upstream.test/v2/places.json".into())
            .build_request(&RequestContext::background(), &params)
            .build()
            .unwrap();

        assert_eq!(
            request.url().query(),
            Some("locale=ru&term=%D0%9C%D0%BE%D1%81%D0%BA%D0%B2%D0%B0&types%5B%5D=city&types%5B%5D=airport")
        );
        assert!(request.timeout().is_none());
    }

    #[tokio::test]
    async fn test_request_timeout_follows_context_deadline() {
        let ctx = RequestContext::background().with_timeout(Duration::from_secs(2));
        let request = requester("http://upstream.test/".into())
            .build_request(&ctx, &SearchParams::default())
            .build()
            .unwrap();

        let timeout = request.timeout().copied().unwrap();
        assert!(timeout <= Duration::from_secs(2));
        assert!(timeout > Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_ok_response_is_decoded() {
        let seen = Arc::new(Mutex::new(None));
        let recorded = seen.clone();
        let endpoint = spawn_upstream(Router::new().route(
            "/v2/places.json",
            get(move |RawQuery(query): RawQuery| {
                let recorded = recorded.clone();
                async move {
                    *recorded.lock().unwrap() = query;
                    UPSTREAM_MOSCOW_JSON
                }
            }),
        ))
        .await;

        let places = requester(endpoint)
            .request(
                &RequestContext::background(),
                &SearchParams::new("mow", "en").with_type("city"),
            )
            .await
            .unwrap();

        assert_eq!(places, vec![moscow()]);
        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("locale=en&term=mow&types%5B%5D=city")
        );
    }

    #[tokio::test]
    async fn test_bad_request_is_client_fault() {
        let endpoint = spawn_upstream(Router::new().route(
            "/v2/places.json",
            get(|| async { AxumStatus::BAD_REQUEST }),
        ))
        .await;

        let result = requester(endpoint)
            .request(&RequestContext::background(), &SearchParams::default())
            .await;

        assert!(matches!(result, Err(SearchError::ClientFault(_))));
    }

    #[tokio::test]
    async fn test_other_status_is_unexpected() {
        let endpoint = spawn_upstream(Router::new().route(
            "/v2/places.json",
            get(|| async { AxumStatus::BAD_GATEWAY }),
        ))
        .await;

        let result = requester(endpoint)
            .request(&RequestContext::background(), &SearchParams::default())
            .await;

        assert_eq!(result, Err(SearchError::UnexpectedStatus(502)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_unexpected() {
        let endpoint = spawn_upstream(
            Router::new().route("/v2/places.json", get(|| async { "{not json" })),
        )
        .await;

        let result = requester(endpoint)
            .request(&RequestContext::background(), &SearchParams::default())
            .await;

        assert!(matches!(result, Err(SearchError::Unexpected(m)) if m.starts_with("decode body")));
    }

    #[tokio::test]
    async fn test_slow_upstream_is_deadline_exceeded() {
        let endpoint = spawn_upstream(Router::new().route(
            "/v2/places.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                UPSTREAM_MOSCOW_JSON
            }),
        ))
        .await;

        let ctx = RequestContext::background().with_timeout(Duration::from_millis(100));
        let result = requester(endpoint)
            .request(&ctx, &SearchParams::default())
            .await;

        assert_eq!(result, Err(SearchError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_caller_cancellation_aborts_request() {
        let endpoint = spawn_upstream(Router::new().route(
            "/v2/places.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                UPSTREAM_MOSCOW_JSON
            }),
        ))
        .await;

        let (ctx, handle) = RequestContext::with_cancel();
        let requester = requester(endpoint);
        let params = SearchParams::default();
        let (result, _) = tokio::join!(requester.request(&ctx, &params), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        });

        assert_eq!(result, Err(SearchError::Cancelled));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unexpected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = requester(format!("http://{addr}/v2/places.json"))
            .request(&RequestContext::background(), &SearchParams::default())
            .await;

        assert!(matches!(result, Err(SearchError::Unexpected(m)) if m.starts_with("do request")));
    }

    #[derive(Debug)]
    struct Wrapped {
        message: &'static str,
        source: Option<Box<dyn StdError + 'static>>,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source.as_deref()
        }
    }

    #[test]
    fn test_chain_finds_wrapped_io_timeout() {
        let err = Wrapped {
            message: "error sending request",
            source: Some(Box::new(io::Error::new(io::ErrorKind::TimedOut, "io"))),
        };
        assert_eq!(classify_chain(&err), Some(SearchError::DeadlineExceeded));
    }

    #[test]
    fn test_chain_matches_messages() {
        let deadline = Wrapped {
            message: "client error",
            source: Some(Box::new(Wrapped {
                message: "context deadline exceeded",
                source: None,
            })),
        };
        let canceled = Wrapped {
            message: "request canceled",
            source: None,
        };
        let other = Wrapped {
            message: "connection reset by peer",
            source: None,
        };

        assert_eq!(classify_chain(&deadline), Some(SearchError::DeadlineExceeded));
        assert_eq!(classify_chain(&canceled), Some(SearchError::Cancelled));
        assert_eq!(classify_chain(&other), None);
    }

    #[test]
    fn test_chain_finds_search_error() {
        let err = Wrapped {
            message: "wrapped",
            source: Some(Box::new(SearchError::Cancelled)),
        };
        assert_eq!(classify_chain(&err), Some(SearchError::Cancelled));
    }
}
