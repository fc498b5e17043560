//! Tourguard - Emergency SOS and complaint lifecycle backend for tourist safety.
//!
//! # Overview
//!
//! Tourists raise complaints (or a one-tap emergency SOS), authorities triage
//! them through a fixed status graph, and every state change is recorded in
//! the complaint's own communication log.
//!
//! - Priority and department are derived from urgency, emergency flag and
//!   category, never accepted from clients.
//! - Status changes follow a closed transition graph. `closed` and `rejected`
//!   are terminal.
//! - Updates are compare-and-swap on a version counter, so concurrent writers
//!   fail instead of overwriting each other.
//! - Notifications are delivered in the background and never fail a request.
//!
//! # Modules
//!
//! - [`model`]: Complaint record, requests, queries and response envelopes
//! - [`policy`]: Priority, department, transitions and safety scoring
//! - [`lifecycle`]: The complaint service owning every state change
//! - [`dashboard`]: Authority alert projection and dashboard statistics
//! - [`aggregation`]: Storage-backed statistics and proximity search
//! - [`notify`]: Notification records and the background notifier
//! - [`storage`]: SQLite document storage
//! - [`auth`]: JWT verification and caller extractors
//! - [`config`]: Environment configuration
//! - [`error`]: Error taxonomy and HTTP mapping
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod policy;
pub mod storage;
