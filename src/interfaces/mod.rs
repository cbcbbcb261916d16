//! Edges where data enters and leaves the gateway: form-encoded HTTP
//! payloads and CSV transaction files.

pub mod csv;
pub mod form;
