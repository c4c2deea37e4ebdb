//! Fixed-window rate limiting
//!
//! Throttles request volume per (client IP, route class). Deliberately a
//! fixed-window counter rather than a sliding log: it admits brief bursts
//! at window boundaries but keeps every check O(1), which is all abuse
//! dampening needs.
//!
//! Policies:
//! - login/registration routes: 10 requests per 5 minutes (strictly tighter
//!   than the default, against credential stuffing)
//! - upload routes: 20 requests per hour
//! - everything else: 100 requests per minute
//!
//! Counters live in a concurrent map keyed per caller and route class, so
//! a read-modify-write on one key never serializes unrelated callers. A
//! background sweep evicts entries idle for more than an hour to bound
//! memory.

use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const AUTH_PREFIXES: &[&str] = &["/api/v1/auth/login", "/api/v1/auth/register"];
const UPLOAD_PREFIXES: &[&str] = &["/api/v1/uploads"];

/// Route classification for throttling purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Auth,
    Upload,
    Default,
}

impl RouteClass {
    /// Classify a request path by prefix.
    pub fn classify(path: &str) -> Self {
        if AUTH_PREFIXES.iter().any(|p| path.starts_with(p)) {
            Self::Auth
        } else if UPLOAD_PREFIXES.iter().any(|p| path.starts_with(p)) {
            Self::Upload
        } else {
            Self::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Upload => "upload",
            Self::Default => "default",
        }
    }
}

/// (max requests, window duration) pair for one route class
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub max: u32,
    pub window: Duration,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Throttled { retry_after_secs: u64 },
}

/// Per-key counting bucket
struct RateWindow {
    count: u32,
    window_start: Instant,
    last_seen: Instant,
}

/// Fixed-window request throttle.
///
/// Injectable component encapsulating all counters; swappable for a
/// distributed store later without touching callers.
pub struct RateLimiter {
    windows: DashMap<(String, RouteClass), RateWindow>,
    auth_policy: RatePolicy,
    upload_policy: RatePolicy,
    default_policy: RatePolicy,
    retention: Duration,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_policies(
            RatePolicy {
                max: 10,
                window: Duration::from_secs(5 * 60),
            },
            RatePolicy {
                max: 20,
                window: Duration::from_secs(60 * 60),
            },
            RatePolicy {
                max: 100,
                window: Duration::from_secs(60),
            },
        )
    }

    pub fn with_policies(
        auth_policy: RatePolicy,
        upload_policy: RatePolicy,
        default_policy: RatePolicy,
    ) -> Self {
        Self {
            windows: DashMap::new(),
            auth_policy,
            upload_policy,
            default_policy,
            retention: Duration::from_secs(60 * 60),
        }
    }

    fn policy(&self, class: RouteClass) -> RatePolicy {
        match class {
            RouteClass::Auth => self.auth_policy,
            RouteClass::Upload => self.upload_policy,
            RouteClass::Default => self.default_policy,
        }
    }

    /// Count a request against its window and decide.
    ///
    /// The entry guard holds a shard lock for the duration of the
    /// read-modify-write, making the update atomic per key. Nothing slow
    /// runs under it.
    pub fn check(&self, caller: &str, class: RouteClass) -> Decision {
        let policy = self.policy(class);
        let now = Instant::now();

        let mut entry = self
            .windows
            .entry((caller.to_string(), class))
            .or_insert_with(|| RateWindow {
                count: 0,
                window_start: now,
                last_seen: now,
            });
        let window = entry.value_mut();

        if now.duration_since(window.window_start) > policy.window {
            window.count = 0;
            window.window_start = now;
        }

        window.count += 1;
        window.last_seen = now;

        if window.count > policy.max {
            let remaining = policy
                .window
                .saturating_sub(now.duration_since(window.window_start));
            let retry_after_secs = (remaining.as_secs_f64().ceil() as u64).max(1);
            Decision::Throttled { retry_after_secs }
        } else {
            Decision::Allowed
        }
    }

    /// Evict entries idle beyond the retention period.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, window| now.duration_since(window.last_seen) <= self.retention);
    }

    /// Number of live counter entries (for tests and diagnostics).
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Spawn the periodic background sweep.
    ///
    /// Runs independently of request handling; in-flight checks are never
    /// blocked waiting for it.
    pub fn spawn_sweeper(limiter: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                limiter.sweep();
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the address a request is counted against.
///
/// The connection peer is authoritative. Forwarded-for headers are
/// client-controlled and only consulted when the deployment declares a
/// trusted proxy in front; otherwise rotating the header would hand an
/// attacker a fresh window per request.
fn caller_address(trust_proxy: bool, request: &Request<Body>) -> Option<String> {
    if trust_proxy {
        if let Some(forwarded) = extract_ip_address(request.headers()) {
            return Some(forwarded);
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
}

/// Rate limiting middleware, applied before authentication.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip_address = caller_address(state.config.server.trust_proxy, &request);
    let caller = ip_address.clone().unwrap_or_else(|| "unknown".to_string());
    let class = RouteClass::classify(request.uri().path());

    match state.limiter.check(&caller, class) {
        Decision::Allowed => Ok(next.run(request).await),
        Decision::Throttled { retry_after_secs } => {
            audit_log(&AuditEvent::RateLimited {
                route_class: class.as_str().to_string(),
                retry_after_secs,
                ip_address,
            });
            Err(AppError::RateLimited { retry_after_secs })
        }
    }
}
