pub mod handler;
pub mod model;
pub mod service;
pub mod store;

pub use handler::AppState;
pub use model::{User, UserPayload};
pub use service::UserService;
pub use store::UserStore;
