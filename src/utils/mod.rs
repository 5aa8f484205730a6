pub mod error;
pub mod phone;
pub mod slug;
pub mod types;

pub use error::ApiError;
pub use error::handler_404;
