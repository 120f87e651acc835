pub mod constants;
pub mod error;
pub mod time;
pub mod types;

pub use constants::*;
pub use error::SereboError;
pub use types::*;
