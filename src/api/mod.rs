// src/api/mod.rs
// HTTP surface: the webhook endpoint and the health/ready/live probe trio.

pub mod http;
