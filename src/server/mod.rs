//! HTTP boundary: query extraction and list routes

pub mod extract;
pub mod router;

pub use extract::ListQuery;
pub use router::{list_handler, list_router};
