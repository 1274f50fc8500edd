//! Wire protocols between client, daemon and fork server

pub mod protocol;
pub mod transport;
