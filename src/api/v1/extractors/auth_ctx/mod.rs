/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Hand the attached security context + current authentication (AuthCtx) to handlers
 * - axum-specific code lives in core; the type lives in types
 *
 * Public API:
 * - AuthCtx
 * - AuthCtxExtractor
 */

mod core;
mod types;

pub use core::AuthCtxExtractor;
pub use types::AuthCtx;
