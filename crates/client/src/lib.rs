//! Remote service clients for the pension wizard.
//!
//! [`api::PensionApi`] talks to the calculation service (calculation,
//! session lookup, email report) and [`chat::ChatAgent`] to the
//! conversational agent webhook. [`services`] holds the traits the wizard
//! controller is written against.

pub mod api;
pub mod chat;
pub mod config;
pub mod services;
