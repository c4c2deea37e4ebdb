//! Application state shared across handlers

use crate::auth::{AuthService, TokenService, UserDirectory};
use crate::handlers::invoices::InvoiceRecord;
use crate::middleware::RateLimiter;
use fiskal_core::AppConfig;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token issuance and verification
    pub tokens: TokenService,
    /// Request throttle
    pub limiter: Arc<RateLimiter>,
    /// External user directory
    pub directory: Arc<dyn UserDirectory>,
    /// Authentication service
    pub auth: AuthService,
    /// Invoice records; stands in for the external record store the
    /// tenant-scoped handlers read from.
    pub invoices: RwLock<Vec<InvoiceRecord>>,
}

impl AppState {
    pub fn new(config: AppConfig, directory: Arc<dyn UserDirectory>) -> Self {
        let tokens = TokenService::new(config.auth.clone());
        let auth = AuthService::new(Arc::clone(&directory), tokens.clone());

        Self {
            config,
            tokens,
            limiter: Arc::new(RateLimiter::new()),
            directory,
            auth,
            invoices: RwLock::new(Vec::new()),
        }
    }

    /// Replace the rate limiter (tighter policies in tests).
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    pub async fn insert_invoice(&self, invoice: InvoiceRecord) {
        self.invoices.write().await.push(invoice);
    }
}
