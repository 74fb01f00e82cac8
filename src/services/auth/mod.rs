pub mod account;
pub mod completion;
pub mod factory;
pub mod request_scope;
pub mod roles;
pub mod security_context;
pub mod service;
pub mod session;
pub mod token_store;
pub mod validator;

pub use completion::{CompletionDispatcher, CompletionError, CompletionHandler};
pub use factory::build_auth_service;
pub use service::AuthService;
