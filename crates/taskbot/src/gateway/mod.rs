//! Transports that feed inbound messages to a [`taskbot_core::Bot`].

pub mod console;
pub mod telegram;
