//! Fetch-with-retry on top of an [`HttpClient`].

use std::sync::Arc;

use tracing::warn;

use crate::error::FetchError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::retry::RetryConfig;

/// Issues a request until it succeeds, fails permanently, or the retry
/// budget is spent. Waits out the retry delay between attempts on the calling
/// task.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: Arc<dyn HttpClient>,
    retry: RetryConfig,
}

impl RetryingFetcher {
    pub fn new(client: Arc<dyn HttpClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Body of the first successful (2xx) response.
    ///
    /// Transport errors flagged retryable and statuses listed in
    /// `retry_on_status` are retried; any other failure returns immediately.
    pub async fn fetch(&self, request: &HttpRequest) -> Result<String, FetchError> {
        let attempts = self.retry.total_attempts();
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.client.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) => {
                    if !self.retry.should_retry_status(response.status) {
                        return Err(FetchError::Rejected {
                            status: response.status,
                        });
                    }
                    last_error = format!("status {}", response.status);
                }
                Err(error) => {
                    if !error.retryable() {
                        return Err(FetchError::Transport {
                            message: error.message().to_owned(),
                        });
                    }
                    last_error = error.message().to_owned();
                }
            }

            if attempt + 1 < attempts {
                let delay = self.retry.delay;
                warn!(
                    url = %request.url,
                    attempt = attempt + 1,
                    of = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "chart fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClient {
        fn new(mut responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("calls lock")
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            *self.calls.lock().expect("calls lock") += 1;
            let next = self
                .responses
                .lock()
                .expect("responses lock")
                .pop()
                .unwrap_or_else(|| Err(HttpError::new("script exhausted")));
            Box::pin(async move { next })
        }
    }

    fn fetcher(client: Arc<ScriptedClient>, max_retries: u32) -> RetryingFetcher {
        RetryingFetcher::new(client, RetryConfig::fixed(Duration::from_millis(1), max_retries))
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let client = ScriptedClient::new(vec![
            Err(HttpError::new("connection reset")),
            Ok(HttpResponse::with_status(503, "busy")),
            Ok(HttpResponse::ok("{\"chart\":{}}")),
        ]);

        let body = fetcher(client.clone(), 3)
            .fetch(&HttpRequest::get("https://example.test"))
            .await
            .expect("third attempt succeeds");

        assert_eq!(body, "{\"chart\":{}}");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let client = ScriptedClient::new(Vec::new());

        let error = fetcher(client.clone(), 2)
            .fetch(&HttpRequest::get("https://example.test"))
            .await
            .expect_err("every attempt fails");

        assert_eq!(
            error,
            FetchError::Exhausted {
                attempts: 3,
                last_error: String::from("script exhausted"),
            }
        );
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn permanent_status_is_not_retried() {
        let client = ScriptedClient::new(vec![Ok(HttpResponse::with_status(404, "missing"))]);

        let error = fetcher(client.clone(), 5)
            .fetch(&HttpRequest::get("https://example.test"))
            .await
            .expect_err("404 is permanent");

        assert_eq!(error, FetchError::Rejected { status: 404 });
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn non_retryable_transport_error_is_not_retried() {
        let client = ScriptedClient::new(vec![Err(HttpError::non_retryable("bad url"))]);

        let error = fetcher(client.clone(), 5)
            .fetch(&HttpRequest::get("not a url"))
            .await
            .expect_err("must fail");

        assert!(matches!(error, FetchError::Transport { .. }));
        assert_eq!(client.calls(), 1);
    }
}
