//! Application bootstrap: configuration + router + server lifecycle.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use may::coroutine::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::router::Router;

use super::service::AppService;

/// Owns the router and configuration until the server starts.
///
/// ```rust,ignore
/// let mut app = trellis::App::new();
/// app.router().get("/health", |ctx: &mut trellis::Context| ctx.text(200, "ok"));
/// let handle = app.start()?;
/// handle.join().ok();
/// ```
pub struct App {
    config: Config,
    router: Router,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        App::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        App {
            config,
            router: Router::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The route tree, for registration before startup.
    pub fn router(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Bind the configured address and serve. Consumes the app; further
    /// registration goes through the returned service's locked router.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured address does not resolve or the
    /// port cannot be bound.
    pub fn start(self) -> io::Result<ServerHandle> {
        may::config().set_stack_size(self.config.stack_size);
        let addr = self
            .config
            .addr()
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "invalid listen address")
            })?;
        let service = AppService::new(
            Arc::new(RwLock::new(self.router)),
            self.config.log_requests,
        );
        let serving = may_minihttp::HttpServer(service).start(addr)?;
        info!(addr = %addr, "server started");
        Ok(ServerHandle { addr, serving })
    }
}

/// Handle to a serving application: readiness probe, shutdown, join.
pub struct ServerHandle {
    addr: SocketAddr,
    serving: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the listener accepts connections, giving up after half a
    /// second.
    pub fn wait_ready(&self) -> io::Result<()> {
        let deadline = Instant::now() + Duration::from_millis(500);
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "server did not start listening",
                ));
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Cancel the accept loop and wait for it to unwind.
    pub fn stop(self) {
        unsafe {
            self.serving.coroutine().cancel();
        }
        let _ = self.serving.join();
    }

    /// Wait for the server to exit on its own.
    pub fn join(self) -> std::thread::Result<()> {
        self.serving.join()
    }
}
