// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcilers for the per-user SSH exposure objects.
//!
//! Each triggering event runs the reconcilers in order:
//!
//! 1. [`reconcile_north_south`] - resolves the user's `LoadBalancer` Service
//!    and returns the label its endpoints must carry
//! 2. [`reconcile_endpoint_slice`] - binds that label to the pod IP
//! 3. [`reconcile_east_west`] - points the in-cluster alias at the pod
//!
//! Steps 2 and 3 are skipped when step 1 resolves no label.
//!
//! All three are idempotent: replaying the same event converges to the same
//! objects through patches, never recreation.
//!
//! # Example
//!
//! ```rust,no_run
//! use cmxsafe_controller::context::Context;
//! use cmxsafe_controller::reconcilers::{
//!     reconcile_east_west, reconcile_endpoint_slice, reconcile_north_south,
//! };
//!
//! async fn expose(ctx: &Context) -> anyhow::Result<()> {
//!     let label = reconcile_north_south(ctx, "alice").await?;
//!     reconcile_endpoint_slice(ctx, &label, "alice", "10.0.0.5").await?;
//!     reconcile_east_west(ctx, "team1", "alice", "10.0.0.5").await?;
//!     Ok(())
//! }
//! ```

pub mod east_west;
pub mod endpoint_slice;
pub mod north_south;

#[cfg(test)]
pub(crate) mod fake_cluster;


pub use east_west::reconcile_east_west;
pub use endpoint_slice::reconcile_endpoint_slice;
pub use north_south::reconcile_north_south;
