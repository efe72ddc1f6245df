pub mod database;
pub mod entities;
pub mod functions;
pub mod identity;
pub mod recorder;
pub mod repositories;
pub mod traits;
