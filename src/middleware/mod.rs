/*
 * Responsibility
 * - Public middleware surface (re-export)
 * - auth: bearer / cached-session authentication for protected routes
 * - http: request id, tracing, limits
 */
pub mod auth;
pub mod http;
pub mod session_cookie;
