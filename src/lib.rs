//! serptrack - SEO rank tracking and analytics backend
//!
//! Multi-tenant backend for tracking keyword rankings, competitors and
//! backlinks through DataForSEO, with Anthropic-powered analysis.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod tasks;
