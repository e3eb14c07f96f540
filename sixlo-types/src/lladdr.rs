use rand::Rng;
use std::fmt::Display;
use std::net::Ipv6Addr;

/// A link layer address, either an IEEE EUI-64 identifier or a 48-bit MAC
/// address. Outside of interface-identifier derivation the address is an
/// opaque token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkLayerAddr {
    Eui64([u8; 8]),
    Mac48([u8; 6]),
}

impl LinkLayerAddr {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Eui64(bytes) => bytes,
            Self::Mac48(bytes) => bytes,
        }
    }

    /// Generates a random, locally administered 48-bit address.
    pub fn gen48(rng: &mut impl Rng) -> LinkLayerAddr {
        let mut mac = rng.gen::<[u8; 6]>();
        mac[0] = 0b1111_1110 & mac[0];
        LinkLayerAddr::Mac48(mac)
    }

    pub fn is_unspecified(&self) -> bool {
        self.as_slice().iter().all(|b| *b == 0)
    }

    /// The modified EUI-64 interface identifier for this address.
    ///
    /// A 64-bit address is taken as-is, a 48-bit address is expanded as
    /// `OUI || ff:fe || NIC`; in both cases the universal/local bit of the
    /// first byte is flipped.
    pub fn iid(&self) -> [u8; 8] {
        let mut iid = [0u8; 8];
        match self {
            Self::Eui64(bytes) => iid.copy_from_slice(bytes),
            Self::Mac48(bytes) => {
                iid[..3].copy_from_slice(&bytes[..3]);
                iid[3] = 0xff;
                iid[4] = 0xfe;
                iid[5..].copy_from_slice(&bytes[3..]);
            }
        }
        iid[0] ^= 0x02;
        iid
    }

    /// Returns `addr` with its low 64 bits replaced by this address's
    /// interface identifier.
    pub fn apply_iid(&self, addr: Ipv6Addr) -> Ipv6Addr {
        let mut octets = addr.octets();
        octets[8..].copy_from_slice(&self.iid());
        Ipv6Addr::from(octets)
    }
}

impl From<[u8; 6]> for LinkLayerAddr {
    fn from(value: [u8; 6]) -> Self {
        LinkLayerAddr::Mac48(value)
    }
}

impl From<[u8; 8]> for LinkLayerAddr {
    fn from(value: [u8; 8]) -> Self {
        LinkLayerAddr::Eui64(value)
    }
}

impl Display for LinkLayerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.as_slice();
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
