//! Kernel - core infrastructure with dependency injection.
//!
//! The scheduling subsystem in [`scheduling`] is the whole of the core;
//! [`server_kernel`] wires its pieces into one process-wide container that
//! `main` constructs once and passes explicitly to the HTTP layer and the
//! process supervisor.
//!
//! IMPORTANT: Kernel is for INFRASTRUCTURE only, not business logic.
//! Business logic belongs in domain layers.

pub mod scheduling;
pub mod server_kernel;

pub use server_kernel::SchedulingKernel;
