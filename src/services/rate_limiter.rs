//! Rate limiter for login attempts
//!
//! Provides protection against brute force attacks by:
//! - Limiting failed login attempts per email (5 attempts per 15 minutes)
//! - Limiting requests per IP address (10 requests per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Login rate limiter
pub struct LoginRateLimiter {
    /// Failed login attempts by email
    email_attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    /// Request attempts by IP address
    ip_attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl LoginRateLimiter {
    /// Create a new rate limiter
    pub fn new() -> Self {
        Self {
            email_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if an email is rate limited (5 failed attempts per 15 minutes)
    pub async fn is_email_limited(&self, email: &str) -> bool {
        let mut attempts = self.email_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(15);

        let email_attempts = attempts.entry(email.to_lowercase()).or_insert_with(Vec::new);
        email_attempts.retain(|time| *time > cutoff);

        email_attempts.len() >= 5
    }

    /// Record a failed login attempt for an email
    pub async fn record_failed_attempt(&self, email: &str) {
        let mut attempts = self.email_attempts.write().await;
        attempts
            .entry(email.to_lowercase())
            .or_insert_with(Vec::new)
            .push(Utc::now());
    }

    /// Clear failed attempts for an email (on successful login)
    pub async fn clear_email_attempts(&self, email: &str) {
        let mut attempts = self.email_attempts.write().await;
        attempts.remove(&email.to_lowercase());
    }

    /// Check if an IP is rate limited (10 requests per minute)
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.ip_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(1);

        let ip_attempts = attempts.entry(ip).or_insert_with(Vec::new);
        ip_attempts.retain(|time| *time > cutoff);

        ip_attempts.len() >= 10
    }

    /// Record a request from an IP
    pub async fn record_ip_request(&self, ip: IpAddr) {
        let mut attempts = self.ip_attempts.write().await;
        attempts.entry(ip).or_insert_with(Vec::new).push(Utc::now());
    }

    /// Clean up old entries (should be called periodically)
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let email_cutoff = now - Duration::minutes(15);
        let ip_cutoff = now - Duration::minutes(1);

        {
            let mut attempts = self.email_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > email_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut attempts = self.ip_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
