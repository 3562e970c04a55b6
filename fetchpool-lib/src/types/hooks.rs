use std::sync::Arc;

use crate::Response;

/// Transforms a completed response before it is classified
pub type ResponseHook<T> = Arc<dyn Fn(Response<T>) -> Response<T> + Send + Sync>;

/// Observes a response which is about to be dropped
pub type ErrorHook<T> = Arc<dyn Fn(&Response<T>) + Send + Sync>;

/// A single extension point of a batch
pub enum Hook<T> {
    /// Called for every response the server answered, right after its
    /// context was attached. The returned response replaces the original one.
    OnResponse(ResponseHook<T>),

    /// Called for responses which are dropped because of a transport failure,
    /// a non-2xx status or an incomplete body while errors are ignored.
    OnError(ErrorHook<T>),
}

/// The hooks of a batch, at most one per kind
///
/// ```
/// use fetchpool_lib::Hooks;
///
/// let hooks: Hooks<String> = Hooks::new()
///     .on_response(|response| response)
///     .on_error(|response| eprintln!("dropped {}", response.url()));
/// ```
pub struct Hooks<T> {
    on_response: Option<ResponseHook<T>>,
    on_error: Option<ErrorHook<T>>,
}

impl<T> Hooks<T> {
    /// No hooks at all
    #[must_use]
    pub const fn new() -> Self {
        Self {
            on_response: None,
            on_error: None,
        }
    }

    /// Set the `OnResponse` hook, replacing a previous one
    #[must_use]
    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(Response<T>) -> Response<T> + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(hook));
        self
    }

    /// Set the `OnError` hook, replacing a previous one
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Response<T>) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Register a hook by kind, replacing a previous one of the same kind
    #[must_use]
    pub fn register(mut self, hook: Hook<T>) -> Self {
        match hook {
            Hook::OnResponse(hook) => self.on_response = Some(hook),
            Hook::OnError(hook) => self.on_error = Some(hook),
        }
        self
    }

    /// Run the `OnResponse` hook; without one the response is kept as-is
    pub(crate) fn response(&self, response: Response<T>) -> Response<T> {
        match &self.on_response {
            Some(hook) => hook(response),
            None => response,
        }
    }

    /// Run the `OnError` hook, if any
    pub(crate) fn error(&self, response: &Response<T>) {
        if let Some(hook) = &self.on_error {
            hook(response);
        }
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        Self {
            on_response: self.on_response.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use http::StatusCode;

    use super::{Hook, Hooks};
    use crate::{Fetched, Response};

    fn response(context: &'static str) -> Response<&'static str> {
        Response::new(
            Fetched::answered(StatusCode::OK, "http://example.com".to_string()),
            context,
        )
    }

    #[test]
    fn test_no_hooks_keep_response() {
        let hooks = Hooks::new();
        let response = hooks.response(response("a"));
        assert_eq!(*response.context(), "a");
        hooks.error(&response);
    }

    #[test]
    fn test_register_replaces_previous_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = calls.clone();
        let second = calls.clone();

        let hooks = Hooks::new()
            .on_error(move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .register(Hook::OnError(Arc::new(move |_: &Response<&str>| {
                second.fetch_add(10, Ordering::SeqCst);
            })));

        hooks.error(&response("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_response_hook_transforms() {
        let hooks = Hooks::new().on_response(|response: Response<&str>| {
            response.with_body(bytes::Bytes::from_static(b"replaced"))
        });
        let response = hooks.response(response("a"));
        assert_eq!(response.body().map(AsRef::as_ref), Some(&b"replaced"[..]));
    }
}
