//! Test utilities for running a local stand-in for the Sentry API.
//!
//! [`start_mitm`] serves every request through a shared, replaceable
//! handler so tests can script responses and inspect request URIs.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use assert_cmd::prelude::*;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Request, Response, StatusCode, body::Incoming, server::conn::http1, service::service_fn,
};
use hyper_util::rt::TokioIo;
use std::io::ErrorKind;
use std::{
    collections::VecDeque,
    net::SocketAddr,
    process::Command,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// Shared handler type invoked for each incoming request.
pub type Handler = Arc<Mutex<Box<dyn FnMut(&Request<Incoming>) -> Response<Full<Bytes>> + Send>>>;

/// Handle returned by [`start_mitm`] for shutting down the server.
pub struct ShutdownHandle {
    join: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl ShutdownHandle {
    /// Signal the server to stop and await shutdown.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.join.await;
    }
}

/// Start an HTTP server forwarding requests to a shared handler.
///
/// # Errors
///
/// Returns an error if the server fails to bind to a local port.
///
/// # Panics
///
/// Panics if the default response cannot be constructed.
#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! uses % internally"
)]
pub async fn start_mitm() -> Result<(SocketAddr, Handler, ShutdownHandle), std::io::Error> {
    let handler: Handler = Arc::new(Mutex::new(Box::new(|_req| {
        Response::builder()
            .status(404)
            .body(Full::from("No handler"))
            .expect("failed to create default response")
    })));
    let handler_clone = handler.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, mut rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                res = listener.accept() => match res {
                    Ok((stream, _)) => {
                        let io = TokioIo::new(stream);
                        let h = handler_clone.clone();
                        let service = service_fn(move |req: Request<Incoming>| {
                            let mut f = h.lock().expect("lock handler in service");
                            let resp = (f)(&req);
                            async move { Ok::<_, std::convert::Infallible>(resp) }
                        });
                        tokio::spawn(async move {
                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                    Err(e) => {
                        eprintln!("accept error: {e}");
                        match e.kind() {
                            ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                            | ErrorKind::Interrupted
                            | ErrorKind::WouldBlock => {}
                            _ => break,
                        }
                    }
                },
                _ = &mut rx => break,
            }
        }
    });

    Ok((addr, handler, ShutdownHandle { join, stop: tx }))
}

/// A scripted reply: status, JSON body and optional `Link` header.
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub link: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            link: None,
        }
    }

    #[must_use]
    pub fn with_next(mut self, url: &str) -> Self {
        self.link = Some(format!(r#"<{url}>; rel="next"; results="true"; cursor="c""#));
        self
    }
}

/// Reply to requests in order and record each request's path and query.
///
/// Requests beyond the script receive a 500 response.
///
/// # Panics
///
/// Panics if a lock is poisoned or a response cannot be built.
pub fn set_sequential_responder(handler: &Handler, replies: Vec<Reply>) -> Arc<Mutex<Vec<String>>> {
    let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    *handler.lock().expect("lock handler") = Box::new(move |req| {
        let target = req
            .uri()
            .path_and_query()
            .map_or_else(String::new, |pq| pq.as_str().to_owned());
        seen_clone.lock().expect("lock seen").push(target);
        let reply = replies.lock().expect("lock replies").pop_front();
        let Some(reply) = reply else {
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::from(r#"{"detail":"unexpected request"}"#))
                .expect("build response");
        };
        let mut builder = Response::builder()
            .status(reply.status)
            .header("Content-Type", "application/json");
        if let Some(link) = reply.link {
            builder = builder.header("Link", link);
        }
        builder.body(Full::from(reply.body)).expect("build response")
    });
    seen
}

/// Create a `sentry-frames` command pointed at the local server.
///
/// # Panics
///
/// Panics if the binary cannot be located.
pub fn sentry_cmd(addr: SocketAddr) -> Command {
    let mut cmd = Command::cargo_bin("sentry-frames").expect("binary");
    cmd.env_remove("SENTRY_AUTH_TOKEN")
        .env_remove("SENTRY_CONFIG_PATH")
        .args(["--url", &format!("http://{addr}"), "--auth-token", "dummy"]);
    cmd
}

/// Set an environment variable for the current test process.
///
/// Callers serialise environment access with `#[serial]`.
pub fn set_var<K: AsRef<std::ffi::OsStr>, V: AsRef<std::ffi::OsStr>>(key: K, value: V) {
    // SAFETY: env-mutating tests run under `#[serial]`.
    unsafe { std::env::set_var(key, value) }
}

/// Remove an environment variable for the current test process.
///
/// Callers serialise environment access with `#[serial]`.
pub fn remove_var<K: AsRef<std::ffi::OsStr>>(key: K) {
    // SAFETY: env-mutating tests run under `#[serial]`.
    unsafe { std::env::remove_var(key) }
}
