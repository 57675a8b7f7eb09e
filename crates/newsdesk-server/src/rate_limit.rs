use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::envelope::Envelope;

/// How often idle buckets are swept.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(300);
/// Buckets untouched for this long are dropped.
pub const MAX_IDLE: Duration = Duration::from_secs(600);

/// Liveness probes are never throttled.
const EXEMPT_PATHS: &[&str] = &["/", "/health"];

#[derive(Debug, Clone)]
struct Allowance {
    tokens: f64,
    seen: Instant,
}

impl Allowance {
    /// Refill for the time elapsed since the last request, then spend one
    /// token. On refusal, returns how long until a token is available.
    fn spend(&mut self, now: Instant, rate: f64, burst: f64) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.seen).as_secs_f64();
        self.seen = now;
        self.tokens = (self.tokens + elapsed * rate).min(burst);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }
        Err(Duration::from_secs_f64((1.0 - self.tokens) / rate))
    }
}

/// Per-client-IP request allowances shared by every route.
#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<IpAddr, Allowance>>>,
    rate: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            rate,
            burst,
        }
    }

    /// Admit one request from `ip`, or return the wait before the next one
    /// would be admitted.
    pub async fn admit(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        clients
            .entry(ip)
            .or_insert_with(|| Allowance {
                tokens: self.burst,
                seen: now,
            })
            .spend(now, self.rate, self.burst)
    }

    /// Forget clients idle for at least `max_idle`.
    pub async fn purge_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, a| now.saturating_duration_since(a.seen) < max_idle);
        before - clients.len()
    }

    /// Sweep idle clients every [`PURGE_INTERVAL`] until the runtime stops.
    pub fn spawn_purge(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                let purged = limiter.purge_idle(MAX_IDLE).await;
                if purged > 0 {
                    debug!(purged, "Purged idle rate limit clients");
                }
            }
        })
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if EXEMPT_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }
    let Some(ip) = client_ip(&req) else {
        return next.run(req).await;
    };

    if let Err(wait) = limiter.admit(ip).await {
        let retry_after = wait.as_secs().max(1);
        warn!(ip = %ip, path = %req.uri().path(), retry_after, "Rate limit exceeded");
        let mut response = Envelope::failure_response(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many requests",
        );
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }
    next.run(req).await
}

/// Socket peer, else the first `X-Forwarded-For` hop, else `X-Real-IP`.
fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(ConnectInfo(peer)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(peer.ip());
    }

    let forwarded: Option<IpAddr> = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|hop| hop.trim().parse().ok());
    forwarded.or_else(|| {
        req.headers()
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}
