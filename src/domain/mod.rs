//! Domain layer: parameter sets, canonical form, signatures, and the
//! transaction model, plus the ports the application layer depends on.

pub mod amount;
pub mod canonical;
pub mod fees;
pub mod notification;
pub mod params;
pub mod ports;
pub mod protocol;
pub mod signature;
pub mod transaction;
