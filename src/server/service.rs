//! The HTTP service gluing wire requests to the router.

use std::io;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use may_minihttp::{HttpService, Request, Response};
use tracing::info;

use crate::router::Router;

use super::request::parse_request;
use super::response::write_response;

/// Per-connection service: parses the request, dispatches through the
/// shared router, and writes the accumulated response.
///
/// The router sits behind a read/write lock so registrations performed
/// while serving are serialized against in-flight matches.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<RwLock<Router>>,
    log_requests: bool,
}

impl AppService {
    pub fn new(router: Arc<RwLock<Router>>, log_requests: bool) -> Self {
        AppService {
            router,
            log_requests,
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let start = Instant::now();
        let parsed = parse_request(req);
        let method = parsed.method.clone();
        let path = parsed.path.clone();

        let parts = {
            let router = self.router.read().expect("router lock poisoned");
            router.handle(parsed)
        };
        let status = parts.status();
        write_response(parts, res);

        if self.log_requests {
            info!(
                method = %method,
                path = %path,
                status = status,
                elapsed_us = start.elapsed().as_micros() as u64,
                "request complete"
            );
        }
        Ok(())
    }
}
