pub mod router;
pub mod users;

pub use router::{build_app, resolve, Route};
