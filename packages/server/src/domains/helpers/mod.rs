//! Mutation API: the boundary domain that turns validated HTTP requests
//! into core calls (`Catalogue`/`UserDirectory` writes plus a background
//! re-plan).

pub mod requests;
pub mod service;

pub use requests::{AdminToggleRequest, MutationError, RegisterHelperRequest, UpdateHelperRequest};
pub use service::HelperMutationService;
