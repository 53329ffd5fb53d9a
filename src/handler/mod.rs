//! Request handler module
//!
//! Responsible for request routing, normalization into commands and
//! dispatch onto the resource store.

pub mod dispatch;
pub mod normalize;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
