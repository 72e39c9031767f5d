//! Building blocks of the `veilpost` binary.
//!
//! A fixture file describes a whole installation (personas, secrets, cached
//! keys, gossip peers and their data). [`Fixture::install`] turns it into a
//! [`Decryption`](veilpost_core::Decryption) engine over in-memory
//! collaborators; [`report`] renders the engine's events as lines of text.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod fixture;
pub mod report;
mod stego;

pub use fixture::{Fixture, FixtureError, Installation};
pub use stego::FixtureStego;
