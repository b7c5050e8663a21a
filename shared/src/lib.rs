//! Wire types shared by the relay server and its clients.

pub mod config;
pub mod protocol;
