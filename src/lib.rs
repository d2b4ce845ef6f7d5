//! Beylerbeyi Residences Lead Capture Library
//!
//! Validates landing-page lead submissions, stores them when a database is
//! configured and notifies the sales team by email and WhatsApp.
//!
//! # Modules
//!
//! - `api`: HTTP router and handler namespace.
//! - `core`: Domain logic (validation, models, dispatch).
//! - `integrations`: Outbound channels (SMTP, WhatsApp relays).
//! - `config`: Configuration management.
//! - `db`: Database connection and schema setup.
//! - `dispatcher`: Multi-channel notification dispatch.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `i18n`: Landing-page translations.
//! - `lead_store`: Lead persistence.
//! - `mailer`: Email notifications.
//! - `models`: Core data models.
//! - `validation`: Phone/email validation and localized error messages.
//! - `whatsapp`: WhatsApp relay chain.

pub mod api;
pub mod core;
pub mod integrations;

pub mod config;
pub mod db;
pub mod dispatcher;
pub mod errors;
pub mod handlers;
pub mod i18n;
pub mod lead_store;
pub mod mailer;
pub mod models;
pub mod validation;
pub mod whatsapp;
