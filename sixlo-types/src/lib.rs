//! Protocol-level value types shared between the ND core and the packet layer.

mod lladdr;
pub use self::lladdr::*;

mod ip;
pub use self::ip::*;

pub mod nd;
