//! Domain core of the pension wizard.
//!
//! Answers, the question registry and its validity rules, wizard
//! transitions, calculation results, and the chat transcript. Pure logic
//! only; storage and network live in `pension-wizard` and `pension-client`.

pub mod answers;
pub mod calculation;
pub mod chat;
pub mod email;
pub mod error;
pub mod format;
pub mod questions;
pub mod types;
pub mod wizard;
