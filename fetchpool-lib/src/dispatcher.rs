use std::{
    fmt,
    num::NonZeroUsize,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::BytesMut;
use futures::{
    Stream, StreamExt,
    future::{self, Future},
};
use log::{debug, error};

use crate::{
    ErrorKind, Fetched, Hooks, Request, Response, transport::Transport,
    utils::reqwest::is_incomplete_read,
};

/// Executes requests with at most `size` of them in flight
///
/// Requests are pulled lazily from the input stream: a new one is only taken
/// when a slot is free and the consumer asks for more responses. Responses
/// come out in completion order.
///
/// Every completed request passes these steps:
///
/// 1. The work item is attached as context. If the server answered, the
///    `OnResponse` hook runs.
/// 2. If errors are ignored, responses without a `2xx` status are logged,
///    handed to the `OnError` hook and dropped.
/// 3. Responses whose body could not be read completely are dropped. The
///    `OnError` hook only sees them if errors are ignored. Bodies which fail
///    for any other reason are dropped without calling a hook.
pub struct Dispatcher<T> {
    transport: Arc<Transport>,
    size: NonZeroUsize,
    ignore_errors: bool,
    prefetch: bool,
    hooks: Hooks<T>,
}

impl<T> Dispatcher<T> {
    pub(crate) fn new(transport: Arc<Transport>, size: NonZeroUsize, ignore_errors: bool) -> Self {
        Self {
            transport,
            size,
            ignore_errors,
            prefetch: true,
            hooks: Hooks::new(),
        }
    }

    /// Maximum number of requests in flight
    #[must_use]
    pub const fn size(mut self, size: NonZeroUsize) -> Self {
        self.size = size;
        self
    }

    /// Drop responses without a `2xx` status instead of yielding them
    #[must_use]
    pub const fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Replace all hooks
    #[must_use]
    pub fn hooks(mut self, hooks: Hooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Skip reading bodies. Yielded responses then carry no body.
    #[cfg(test)]
    pub(crate) const fn prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Start executing `requests`
    ///
    /// Nothing happens until the returned stream is polled. Dropping the
    /// stream cancels all requests in flight and leaves the rest untouched.
    pub fn dispatch<S>(self, requests: S) -> ResponseStream<T>
    where
        S: Stream<Item = Request<T>> + Send + 'static,
    {
        let Self {
            transport,
            size,
            ignore_errors,
            prefetch,
            hooks,
        } = self;
        let collector = Collector {
            ignore_errors,
            hooks,
        };

        let responses = requests
            .map(move |request| execute(Arc::clone(&transport), request, prefetch))
            .buffer_unordered(size.get())
            .filter_map(move |(request, fetched)| future::ready(collector.collect(request, fetched)));

        ResponseStream {
            inner: Box::pin(responses),
        }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("size", &self.size)
            .field("ignore_errors", &self.ignore_errors)
            .field("prefetch", &self.prefetch)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Send a single request and read its body
fn execute<T>(
    transport: Arc<Transport>,
    request: Request<T>,
    prefetch: bool,
) -> impl Future<Output = (Request<T>, Fetched)> {
    async move {
        debug!("Sending {request}");
        let fetched = match transport.prepare(&request.method, &request.url).send().await {
            Ok(response) => read(response, prefetch).await,
            Err(e) => Fetched::failed(request.url.clone(), ErrorKind::NetworkRequest(e)),
        };
        (request, fetched)
    }
}

/// Turn a reqwest response into [`Fetched`], reading the body if `prefetch`
/// is set
async fn read(mut response: reqwest::Response, prefetch: bool) -> Fetched {
    let status = response.status();
    let url = response.url().to_string();
    let headers = std::mem::take(response.headers_mut());
    let answered = Fetched {
        headers,
        ..Fetched::answered(status, url)
    };
    if !prefetch {
        return answered;
    }

    let expected = response.content_length();
    let mut body = BytesMut::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => {
                return Fetched {
                    body: Some(body.freeze()),
                    ..answered
                };
            }
            Err(e) => {
                let received = body.len();
                let error = if is_incomplete_read(&e, received, expected) {
                    ErrorKind::IncompleteBody {
                        received,
                        expected,
                        source: e,
                    }
                } else {
                    ErrorKind::UnexpectedBody(e)
                };
                return Fetched {
                    error: Some(error),
                    ..answered
                };
            }
        }
    }
}

/// Decides which completed requests reach the consumer
struct Collector<T> {
    ignore_errors: bool,
    hooks: Hooks<T>,
}

impl<T> Collector<T> {
    fn collect(&self, request: Request<T>, fetched: Fetched) -> Option<Response<T>> {
        let response = request.complete(fetched, &self.hooks);

        if self.ignore_errors && !response.is_success() {
            error!("{response}");
            self.hooks.error(&response);
            return None;
        }

        match response.error() {
            Some(ErrorKind::IncompleteBody { .. }) => {
                error!("{response}");
                if self.ignore_errors {
                    self.hooks.error(&response);
                }
                None
            }
            Some(ErrorKind::UnexpectedBody(_)) => {
                error!("{response}");
                None
            }
            _ => {
                debug!("{response}");
                Some(response)
            }
        }
    }
}

/// Responses of a dispatched batch, in completion order
///
/// Consume it with [`StreamExt`](futures::StreamExt), e.g. `next()` or
/// `collect()`.
pub struct ResponseStream<T> {
    inner: Pin<Box<dyn Stream<Item = Response<T>> + Send>>,
}

impl<T> Stream for ResponseStream<T> {
    type Item = Response<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> fmt::Debug for ResponseStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        num::NonZeroUsize,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use futures::{StreamExt, stream};
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use reqwest::Method;
    use test_utils::{mock_route, mock_server};
    use wiremock::MockServer;

    use super::Dispatcher;
    use crate::{
        ErrorKind, Hooks, Request, RequestBuilder, Response,
        test_utils::{closed_port_url, gauge_server, truncating_server},
        transport::Transport,
    };

    const fn size(n: usize) -> NonZeroUsize {
        match NonZeroUsize::new(n) {
            Some(n) => n,
            None => panic!("size must not be zero"),
        }
    }

    fn dispatcher<T>(size: NonZeroUsize, ignore_errors: bool) -> Dispatcher<T> {
        let transport = Transport::new(reqwest::Client::new());
        Dispatcher::new(Arc::new(transport), size, ignore_errors)
    }

    fn requests(urls: Vec<String>) -> impl futures::Stream<Item = Request<String>> + Send {
        let builder = RequestBuilder::new(Method::GET);
        stream::iter(urls).map(move |url| builder.build(url))
    }

    async fn statuses(server: &MockServer) {
        mock_route!(server, "/ok", 200, set_body_string("ok"));
        mock_route!(server, "/404", 404);
        mock_route!(server, "/500", 500);
    }

    /// Collects the URLs seen by the `OnError` hook
    fn recording_hooks() -> (Hooks<String>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let hooks = Hooks::new().on_error(move |response: &Response<String>| {
            recorder.lock().unwrap().push(response.context().clone());
        });
        (hooks, seen)
    }

    #[tokio::test]
    async fn test_ignore_errors_drops_non_success() {
        let server = MockServer::start().await;
        statuses(&server).await;
        let urls = ["/ok", "/404", "/500"].map(|path| format!("{}{path}", server.uri()));
        let (hooks, seen) = recording_hooks();

        let responses: Vec<_> = dispatcher(size(2), true)
            .hooks(hooks)
            .dispatch(requests(urls.to_vec()))
            .collect()
            .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status(), Some(StatusCode::OK));
        assert_eq!(responses[0].text().as_deref(), Some("ok"));
        assert_eq!(*responses[0].context(), urls[0]);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![urls[1].clone(), urls[2].clone()]);
    }

    #[tokio::test]
    async fn test_keep_errors_yields_everything() {
        let server = MockServer::start().await;
        statuses(&server).await;
        let urls = ["/ok", "/404", "/500"].map(|path| format!("{}{path}", server.uri()));
        let (hooks, seen) = recording_hooks();

        let mut codes: Vec<_> = dispatcher(size(2), false)
            .hooks(hooks)
            .dispatch(requests(urls.to_vec()))
            .map(|response| response.status().map(|code| code.as_u16()))
            .collect()
            .await;
        codes.sort();

        assert_eq!(codes, vec![Some(200), Some(404), Some(500)]);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_response_hook_runs_before_filtering() {
        let server = mock_server!(200, set_body_string("original"));
        let hooks = Hooks::new()
            .on_response(|response: Response<String>| response.with_body("patched".into()));

        let responses: Vec<_> = dispatcher(size(1), true)
            .hooks(hooks)
            .dispatch(requests(vec![server.uri()]))
            .collect()
            .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].text().as_deref(), Some("patched"));
    }

    #[tokio::test]
    async fn test_response_hook_sees_context() {
        #[derive(Debug, Clone)]
        struct Job {
            id: usize,
            target: String,
        }

        let server = mock_server!(200);
        let jobs: Vec<_> = (0..4)
            .map(|id| Job {
                id,
                target: format!("{}/{id}", server.uri()),
            })
            .collect();
        let builder = RequestBuilder::with_key(Method::GET, |job: &Job| job.target.clone());

        let hook_ids = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&hook_ids);
        let hooks = Hooks::new().on_response(move |response: Response<Job>| {
            recorder.lock().unwrap().push(response.context().id);
            response
        });

        let responses: Vec<_> = dispatcher(size(2), true)
            .hooks(hooks)
            .dispatch(stream::iter(jobs).map(move |job| builder.build(job)))
            .collect()
            .await;

        let mut ids: Vec<_> = responses.iter().map(|r| r.context().id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        for response in &responses {
            assert!(response.url().ends_with(&format!("/{}", response.context().id)));
        }
        hook_ids.lock().unwrap().sort_unstable();
        assert_eq!(*hook_ids.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let responses: Vec<Response<String>> = dispatcher(size(3), true)
            .dispatch(requests(Vec::new()))
            .collect()
            .await;
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn test_never_exceeds_pool_size() {
        let (base, gauge) = gauge_server(Duration::from_millis(100)).await;
        let urls = (0..10).map(|i| format!("{base}/{i}")).collect();

        let responses: Vec<_> = dispatcher(size(3), true)
            .dispatch(requests(urls))
            .collect()
            .await;

        assert_eq!(responses.len(), 10);
        assert!(gauge.peak() <= 3, "peak was {}", gauge.peak());
        assert!(gauge.peak() >= 2, "peak was {}", gauge.peak());
    }

    #[tokio::test]
    async fn test_pool_size_one_is_sequential() {
        let (base, gauge) = gauge_server(Duration::from_millis(20)).await;
        let urls = (0..4).map(|i| format!("{base}/{i}")).collect();

        let responses: Vec<_> = dispatcher(size(1), true)
            .dispatch(requests(urls))
            .collect()
            .await;

        assert_eq!(responses.len(), 4);
        assert_eq!(gauge.peak(), 1);
    }

    #[tokio::test]
    async fn test_completion_order() {
        let server = MockServer::start().await;
        mock_route!(server, "/slow", 200, set_delay(Duration::from_millis(500)));
        mock_route!(server, "/fast", 200);
        let urls = vec![format!("{}/slow", server.uri()), format!("{}/fast", server.uri())];

        let order: Vec<_> = dispatcher(size(2), true)
            .dispatch(requests(urls.clone()))
            .map(Response::into_context)
            .collect()
            .await;

        assert_eq!(order, vec![urls[1].clone(), urls[0].clone()]);
    }

    #[tokio::test]
    async fn test_requests_are_pulled_lazily() {
        let server = mock_server!(200);
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let builder = RequestBuilder::new(Method::GET);
        let uri = server.uri();
        let input = stream::iter(0..100).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            builder.build(format!("{uri}/{i}"))
        });

        let mut responses = dispatcher(size(2), true).dispatch(input);
        assert_eq!(pulled.load(Ordering::SeqCst), 0);

        assert!(responses.next().await.is_some());
        assert!(pulled.load(Ordering::SeqCst) <= 3);
        drop(responses);
        assert!(pulled.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_transport_failure_ignored() {
        let url = closed_port_url().await;
        let (hooks, seen) = recording_hooks();
        let called = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&called);
        let hooks = hooks.on_response(move |response| {
            counter.fetch_add(1, Ordering::SeqCst);
            response
        });

        let responses: Vec<_> = dispatcher(size(1), true)
            .hooks(hooks)
            .dispatch(requests(vec![url.clone()]))
            .collect()
            .await;

        assert!(responses.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![url]);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_kept() {
        let url = closed_port_url().await;

        let responses: Vec<_> = dispatcher(size(1), false)
            .dispatch(requests(vec![url.clone()]))
            .collect()
            .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status(), None);
        assert_eq!(responses[0].url(), url);
        assert!(matches!(
            responses[0].error(),
            Some(ErrorKind::NetworkRequest(_))
        ));
        assert!(responses[0].to_string().starts_with("[ERR] "));
    }

    #[tokio::test]
    async fn test_malformed_url_is_a_transport_failure() {
        let responses: Vec<_> = dispatcher(size(1), false)
            .dispatch(requests(vec!["not a url".to_string()]))
            .collect()
            .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status(), None);
        assert_eq!(responses[0].url(), "not a url");
    }

    #[tokio::test]
    async fn test_incomplete_body_with_ignored_errors() {
        let url = truncating_server(100, b"only a few bytes").await;
        let (hooks, seen) = recording_hooks();

        let responses: Vec<_> = dispatcher(size(1), true)
            .hooks(hooks)
            .dispatch(requests(vec![url.clone()]))
            .collect()
            .await;

        assert!(responses.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![url]);
    }

    #[tokio::test]
    async fn test_incomplete_body_with_kept_errors() {
        let url = truncating_server(100, b"only a few bytes").await;
        let (hooks, seen) = recording_hooks();

        let responses: Vec<_> = dispatcher(size(1), false)
            .hooks(hooks)
            .dispatch(requests(vec![url]))
            .collect()
            .await;

        assert!(responses.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_body_is_recorded() {
        let url = truncating_server(100, b"0123456789").await;
        let errors = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&errors);
        let hooks = Hooks::new().on_error(move |response: &Response<String>| {
            if let Some(ErrorKind::IncompleteBody {
                received, expected, ..
            }) = response.error()
            {
                recorder.lock().unwrap().push((*received, *expected));
            }
        });

        let responses: Vec<_> = dispatcher(size(1), true)
            .hooks(hooks)
            .dispatch(requests(vec![url]))
            .collect()
            .await;

        assert!(responses.is_empty());
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        let (received, expected) = errors[0];
        assert!(received <= 10);
        assert_eq!(expected, Some(100));
    }

    #[tokio::test]
    async fn test_undecodable_body_dropped_without_hook() {
        let server = mock_server!(
            200,
            insert_header("content-encoding", "gzip"),
            set_body_bytes(vec![b'x'; 64])
        );

        for ignore_errors in [true, false] {
            let (hooks, seen) = recording_hooks();
            let responses: Vec<_> = dispatcher(size(1), ignore_errors)
                .hooks(hooks)
                .dispatch(requests(vec![server.uri()]))
                .collect()
                .await;

            assert!(responses.is_empty());
            assert!(seen.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_without_prefetch_bodies_are_not_read() {
        let server = mock_server!(200, set_body_string("unread"));

        let responses: Vec<_> = dispatcher(size(1), true)
            .prefetch(false)
            .dispatch(requests(vec![server.uri()]))
            .collect()
            .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status(), Some(StatusCode::OK));
        assert!(responses[0].body().is_none());
    }

    #[tokio::test]
    async fn test_post_method_is_used() {
        let server = MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;
        let builder = RequestBuilder::new(Method::POST);
        let input = stream::iter(vec![server.uri(), server.uri()]).map(move |url| builder.build(url));

        let responses: Vec<_> = dispatcher(size(2), true).dispatch(input).collect().await;

        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r.status() == Some(StatusCode::CREATED)));
    }
}
