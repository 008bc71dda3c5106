use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;

use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

use crate::introspect::{HostContext, Introspector};
use crate::trace::SessionTrace;

use super::dispatch::{Request, dispatch, error_response};

const QUEUE_DEPTH: usize = 64;

type Job = (Request, oneshot::Sender<Value>);

#[derive(Clone)]
pub struct IntrospectionService {
    jobs: mpsc::Sender<Job>,
}

impl IntrospectionService {
    pub fn spawn<H>(introspector: Introspector<H>, trace: SessionTrace) -> std::io::Result<Self>
    where
        H: HostContext + Send + 'static,
    {
        let (jobs, mut queue) = mpsc::channel::<Job>(QUEUE_DEPTH);
        thread::Builder::new()
            .name("introspector".to_string())
            .spawn(move || {
                while let Some((request, reply)) = queue.blocking_recv() {
                    let response = run_guarded(&introspector, &request, &trace);
                    // The caller may have gone away; its answer is simply dropped.
                    let _ = reply.send(response);
                }
            })?;
        Ok(Self { jobs })
    }

    pub async fn call(&self, request: Request) -> Value {
        let id = request.id.clone();
        let (reply, answer) = oneshot::channel();
        if self.jobs.send((request, reply)).await.is_err() {
            return worker_gone(&id);
        }
        answer.await.unwrap_or_else(|_| worker_gone(&id))
    }
}

fn run_guarded<H: HostContext>(
    introspector: &Introspector<H>,
    request: &Request,
    trace: &SessionTrace,
) -> Value {
    match catch_unwind(AssertUnwindSafe(|| dispatch(introspector, request))) {
        Ok(response) => response,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            trace.log_kernel(&format!("introspection worker panic on {}: {message}", request.op));
            error_response(
                &request.id,
                "internal",
                &format!("introspection failed: {message}"),
                json!({ "op": request.op }),
            )
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn worker_gone(id: &Value) -> Value {
    error_response(id, "internal", "introspection worker stopped", json!({}))
}
