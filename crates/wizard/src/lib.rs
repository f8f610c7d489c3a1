//! Wizard runtime: durable storage, session identity, the persisted wizard
//! state, the controller that drives the flow against the remote services,
//! and a terminal front-end.

pub mod controller;
pub mod intro;
pub mod session;
pub mod state;
pub mod storage;
pub mod terminal;
