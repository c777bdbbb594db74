// Authentication module
// Cookie/JWT sessions with registration, login, logout and role-gated lookup

pub mod cookie;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use handlers::{get_user_handler, login_handler, logout_handler, me_handler, register_handler};
pub use middleware::require_admin;
pub use models::{LoginRequest, RegisterRequest, Role, SessionResponse, UserResponse};
pub use repository::UserRepository;
pub use service::AuthService;
