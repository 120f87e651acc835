pub mod db;
pub mod handlers;
pub mod server;

pub use db::NotaryDb;
pub use handlers::NotaryService;
pub use server::router;
