//! Parsed neighbor discovery option structures.
//!
//! The packet layer parses ND messages off the wire and hands these to the
//! core; the core never touches wire bytes itself.

use std::net::Ipv6Addr;

/// A parsed 6LoWPAN context option (6CO), carried in router advertisements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextOption {
    /// Context id, 0..15.
    pub context_id: u8,
    /// Whether the context may be used for compression. When unset the
    /// context is valid for decompression only.
    pub compress: bool,
    /// The network part of the context prefix, in bits.
    pub prefix_len: u8,
    /// The context prefix.
    pub prefix: Ipv6Addr,
    /// Remaining validity of the context, in seconds.
    pub valid_lifetime: u16,
}

/// Status delivered in the address registration option of a neighbor
/// advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationStatus {
    /// The registration succeeded.
    Success,
    /// The address is already registered by another node.
    DuplicateAddress,
    /// The router's neighbor cache has no room for the registration.
    NeighborCacheFull,
}

impl RegistrationStatus {
    pub fn from_code(code: u8) -> Option<RegistrationStatus> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::DuplicateAddress),
            2 => Some(Self::NeighborCacheFull),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::DuplicateAddress => 1,
            Self::NeighborCacheFull => 2,
        }
    }
}
