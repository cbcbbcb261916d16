//! Application layer: the two flows a host drives.
//!
//! `request_builder` turns an order into signed redirect parameters and
//! `reconciler` applies acquirer notifications to stored transactions.

pub mod reconciler;
pub mod request_builder;
