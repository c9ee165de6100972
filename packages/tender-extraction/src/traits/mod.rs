//! Core trait abstractions for the tender extraction library.
//!
//! These traits define the seams applications implement to provide
//! the completion service and the time source used for cache expiry.

pub mod clock;
pub mod completion;
