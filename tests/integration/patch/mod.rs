//! SCIM PATCH Operation Integration Tests
//!
//! Requests are run against the Widget test resource type through
//! `PatchRequestHandler`, recording every handler notification.

pub mod complex;
pub mod errors;
pub mod simple_attributes;
pub mod workarounds;
