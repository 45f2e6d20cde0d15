//! Transport layer between the session and the remote match authority.
//!
//! The library only defines the contract ([`transport::MatchTransport`]) and
//! the JSON shapes exchanged with the authority; concrete clients live with
//! the binaries that link an HTTP stack.

/// Transport failure taxonomy.
pub mod errors;

/// Request and response bodies of the match authority.
pub mod messages;

/// The transport contract consumed by the session.
pub mod transport;
