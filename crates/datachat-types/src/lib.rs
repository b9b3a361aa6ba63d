//! Shared types for the datachat analytics client.

mod answer;
mod chat;
mod database;
mod query;

pub use answer::*;
pub use chat::*;
pub use database::*;
pub use query::*;
