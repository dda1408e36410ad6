//! CaneLedger: digitization service for paper sugar-cane delivery receipts.
//!
//! A photographed receipt is uploaded over the HTTP API, read by a fallback
//! chain of local vision models, scored for completeness, and persisted
//! alongside the original image. Receipts the models could not read are kept
//! anyway and flagged for manual entry.

pub mod api;
pub mod config;
pub mod db;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod storage;
