//! Shared wire and domain types for the combiner service.
//!
//! [`proto`] holds the generated protobuf messages and the `Combiner` gRPC
//! service; [`types`] holds the transport-agnostic canonical message model.

pub mod types;

pub mod proto {
    #![allow(clippy::pedantic)]
    #![allow(clippy::missing_errors_doc)]
    #![allow(clippy::doc_markdown)]
    #![allow(clippy::default_trait_access)]
    tonic::include_proto!("seldon.protos");
}
