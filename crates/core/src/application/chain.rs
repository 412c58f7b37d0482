// Middleware Chain - ordered hooks around one handler invocation
//
// Received -> PreDispatch(0..n) -> Dispatched -> PostDispatch(0..n) -> Responded
//
// Post-dispatch hooks run in registration order, NOT reversed: each hook sees
// the output of the previous one. A failure before dispatch skips the
// remaining pre hooks and the handler, but every post hook still runs.

use crate::application::panic_guard::{execute_guarded, execute_guarded_async, PanicGuardResult};
use crate::application::HandlerEntry;
use crate::domain::{ErrorObject, Outcome, Request, Response};
use crate::port::BoxedMiddleware;
use tracing::{debug, warn};

/// One dispatch: registry-wide middlewares, then the entry's own list.
pub struct Chain<'a> {
    global: &'a [BoxedMiddleware],
    entry: &'a HandlerEntry,
}

impl<'a> Chain<'a> {
    pub fn new(global: &'a [BoxedMiddleware], entry: &'a HandlerEntry) -> Self {
        Self { global, entry }
    }

    fn middlewares(&self) -> impl Iterator<Item = &'a BoxedMiddleware> {
        self.global.iter().chain(self.entry.middlewares().iter())
    }

    pub async fn execute(&self, request: Request) -> Response {
        let id = request.id;

        let outcome = match self.pre_dispatch(&request) {
            Ok(()) => self.invoke(request).await,
            Err(err) => Err(err),
        };

        Response::new(id, self.post_dispatch(outcome))
    }

    fn pre_dispatch(&self, request: &Request) -> Result<(), ErrorObject> {
        for (index, middleware) in self.middlewares().enumerate() {
            let result = match execute_guarded(|| middleware.process_request(request)) {
                PanicGuardResult::Success(result) => result,
                PanicGuardResult::Panicked(msg) => Err(ErrorObject::internal(msg)),
            };
            if let Err(err) = result {
                debug!(
                    method = %request.method,
                    id = request.id,
                    hook = index,
                    code = err.code,
                    "Pre-dispatch hook aborted the chain"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    async fn invoke(&self, request: Request) -> Outcome {
        let method = request.method.clone();
        let call = self.entry.handler().call(request);
        match execute_guarded_async(call).await {
            PanicGuardResult::Success(outcome) => outcome,
            PanicGuardResult::Panicked(msg) => {
                warn!(method = %method, "Handler panicked, responding with internal error");
                Err(ErrorObject::internal(msg))
            }
        }
    }

    fn post_dispatch(&self, mut outcome: Outcome) -> Outcome {
        for middleware in self.middlewares() {
            outcome = match execute_guarded(|| middleware.process_response(outcome)) {
                PanicGuardResult::Success(next) => next,
                PanicGuardResult::Panicked(msg) => Err(ErrorObject::internal(msg)),
            };
        }
        outcome
    }
}
