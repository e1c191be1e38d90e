//! Security utilities for credential protection.
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers for automatic memory clearing
//! - Secrets are redacted from `Debug` output, logs, and reports
//!
//! # Module Structure
//! - `credentials`: Secure credential container with automatic memory zeroing

mod credentials;

// Re-export public types
pub use credentials::Credentials;
