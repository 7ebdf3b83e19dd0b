pub mod backend;

pub use backend::{normalize_link, BackendClient};
