pub mod me;
pub mod sso;
