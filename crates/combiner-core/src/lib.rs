//! Validation and dispatch pipeline of the combiner service.
//!
//! A [`Combiner`] takes the `seldonMessages` list of one request, checks its
//! shape, hands it to the user's aggregation collaborator through whichever
//! contract that collaborator supports for the transport, and encodes the
//! combined message back into the same wire form. The pipeline is strictly
//! linear:
//!
//! `validate -> decode -> dispatch -> assemble -> validate metrics -> encode`
//!
//! Collaborators are described by a [`model::UserModel`]; the contract for
//! each transport is resolved once when the [`Combiner`] is built.

pub mod assemble;
pub mod builtin;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod validate;


pub use error::{CombinerError, Result};
pub use pipeline::Combiner;
