//! Integration tests, served over a real socket against the in-memory store.

mod helpers;
mod subscriptions;
