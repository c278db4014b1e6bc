//! Filter engine integration tests.
//!
//! - `evaluation` - matching RFC 7643 resources against parsed filters
//! - `parsing` - error reporting and canonical serialization
//! - `property_tests` - round-trip and robustness properties

pub mod evaluation;
