// Handler Registry - method name -> (handler, ordered middlewares)

use crate::application::Chain;
use crate::domain::{ErrorObject, Request, Response};
use crate::error::{Error, Result};
use crate::port::{BoxedHandler, BoxedMiddleware, Handler, Middleware};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A registered method. Immutable once created.
pub struct HandlerEntry {
    method: String,
    handler: BoxedHandler,
    middlewares: Vec<BoxedMiddleware>,
}

impl HandlerEntry {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// Per-method middlewares in registration order.
    pub fn middlewares(&self) -> &[BoxedMiddleware] {
        &self.middlewares
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("method", &self.method)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Method table, built once during setup and read concurrently afterwards.
///
/// Registration takes `&mut self`; once the registry is moved into the server
/// it is shared behind an `Arc` and resolution takes no lock.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, HandlerEntry>,
    global: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("methods", &self.methods())
            .field("global_middlewares", &self.global.len())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware that runs for every resolved method, ahead of the
    /// per-method list. Builder form of [`Registry::use_middleware`].
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.global.push(Arc::new(middleware));
        self
    }

    pub fn use_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.global.push(middleware);
        self
    }

    /// Register `handler` under `method` with its ordered middleware list.
    ///
    /// Duplicate and empty method names are rejected with
    /// [`Error::Registration`]; an existing entry is never overwritten.
    pub fn register<H: Handler>(
        &mut self,
        method: impl Into<String>,
        handler: H,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self> {
        self.register_boxed(method, Arc::new(handler), middlewares)
    }

    pub fn register_boxed(
        &mut self,
        method: impl Into<String>,
        handler: BoxedHandler,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self> {
        let method = method.into();
        if method.is_empty() {
            return Err(Error::Registration("method name must not be empty".into()));
        }
        if self.entries.contains_key(&method) {
            return Err(Error::Registration(format!(
                "method {:?} is already registered",
                method
            )));
        }

        debug!(method = %method, middlewares = middlewares.len(), "Registered method");
        self.entries.insert(
            method.clone(),
            HandlerEntry {
                method,
                handler,
                middlewares,
            },
        );
        Ok(self)
    }

    pub fn resolve(&self, method: &str) -> Result<&HandlerEntry> {
        self.entries
            .get(method)
            .ok_or_else(|| Error::NotFound(method.to_string()))
    }

    /// Resolve and run the middleware chain for one request.
    ///
    /// An unknown method yields `METHOD_NOT_FOUND` without touching any
    /// middleware, global ones included.
    pub async fn dispatch(&self, request: Request) -> Response {
        match self.resolve(&request.method) {
            Ok(entry) => Chain::new(&self.global, entry).execute(request).await,
            Err(_) => {
                debug!(method = %request.method, id = request.id, "Method not found");
                Response::error(request.id, ErrorObject::method_not_found(&request.method))
            }
        }
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
