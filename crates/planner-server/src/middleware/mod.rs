//! HTTP middleware for the planner server.

pub mod request_id;
