pub mod conversation;
pub mod directory;
pub mod notifications;
pub mod router;
pub mod services;
pub mod traits;
pub mod transcript;
