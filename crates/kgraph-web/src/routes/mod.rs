//! Route handlers.

pub mod chat;
pub mod graph;
pub mod health;
pub mod kg;
