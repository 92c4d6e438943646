//! Projection of KEEP token `Transfer` events into token, holder, transfer
//! and transaction entities stored in SQLite.

pub mod accessors;
pub mod config;
pub mod constants;
pub mod deployment;
pub mod dispatch;
pub mod entities;
pub mod error;
pub mod events;
pub mod projector;
pub mod repository;
pub mod rpc;
pub mod scanner;
pub mod store;
