pub mod config;
pub mod db;
pub mod editor;
pub mod images;
pub mod llm;
pub mod models;
pub mod research;
pub mod routes;
pub mod state;
pub mod writer;

pub use config::Config;
pub use db::{Database, DbError};
pub use state::AppState;
