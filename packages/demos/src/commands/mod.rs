//! Demo command handlers

pub mod await_basics;
pub mod channel;
pub mod list;
pub mod valuetask;
pub mod when_all;
