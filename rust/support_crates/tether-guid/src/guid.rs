use std::cmp::Ordering;
use std::io;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 16-byte GUID, little-endian field layout compatible with the Windows `GUID` struct.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "uuid::Uuid", into = "uuid::Uuid")
)]
#[repr(C)]
pub struct Guid([u8; 16]);

impl Guid {
    /// Generates a new random (v4) GUID.
    pub fn new() -> Guid {
        uuid::Uuid::new_v4().into()
    }

    /// Returns the NIL (all zero) GUID.
    pub const fn nil() -> Guid {
        Guid([0; 16])
    }

    /// Builds a GUID from its 128-bit numeric form, as written in IDL:
    /// `0x00000000_0000_0000_c000_000000000046` is `00000000-0000-0000-c000-000000000046`.
    pub const fn from_u128(value: u128) -> Guid {
        let a = (value >> 96) as u32;
        let b = (value >> 80) as u16;
        let c = (value >> 64) as u16;
        let d = (value as u64).to_be_bytes();
        Guid::from_fields(a, b, c, &d)
    }

    /// Constructs a GUID from individual field components (a, b, c, d).
    pub const fn from_fields(a: u32, b: u16, c: u16, d: &[u8; 8]) -> Guid {
        let a = a.to_le_bytes();
        let b = b.to_le_bytes();
        let c = c.to_le_bytes();
        Guid([
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], d[0], d[1], d[2], d[3], d[4], d[5],
            d[6], d[7],
        ])
    }

    /// Decomposes the GUID into its field components.
    pub const fn to_fields(&self) -> (u32, u16, u16, [u8; 8]) {
        let s = &self.0;
        let a = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
        let b = u16::from_le_bytes([s[4], s[5]]);
        let c = u16::from_le_bytes([s[6], s[7]]);
        let d = [s[8], s[9], s[10], s[11], s[12], s[13], s[14], s[15]];
        (a, b, c, d)
    }

    /// Returns the 128-bit numeric form, the inverse of [`Guid::from_u128`].
    pub const fn to_u128(&self) -> u128 {
        let (a, b, c, d) = self.to_fields();
        ((a as u128) << 96)
            | ((b as u128) << 80)
            | ((c as u128) << 64)
            | u64::from_be_bytes(d) as u128
    }

    /// Parses a GUID from a canonical, braced, or hyphen-less hexadecimal string.
    pub fn parse_str(input: &str) -> Result<Guid, io::Error> {
        uuid::Uuid::parse_str(input)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
            .map(|u| u.into())
    }

    /// Creates a GUID by copying from a 16-byte array.
    pub const fn from_bytes(bytes: &[u8; 16]) -> Guid {
        Guid(*bytes)
    }

    /// Returns a reference to the underlying 16 raw bytes.
    pub const fn bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Builds a GUID from a 16-byte slice, validating length.
    pub fn from_slice(s: &[u8]) -> io::Result<Guid> {
        Ok(Guid(s.try_into().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidInput, e)
        })?))
    }

    /// Returns the underlying bytes as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if this GUID equals the NIL GUID.
    pub fn is_nil(&self) -> bool {
        *self == Guid::nil()
    }

    /// Compares this GUID to another using field order (a, b, c, d).
    pub fn compare(&self, other: &Guid) -> Ordering {
        let (a0, b0, c0, d0) = self.to_fields();
        let (a1, b1, c1, d1) = other.to_fields();
        a0.cmp(&a1)
            .then(b0.cmp(&b1))
            .then(c0.cmp(&c1))
            .then(d0.cmp(&d1))
    }
}

impl PartialOrd for Guid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Guid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl std::fmt::Debug for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        uuid::Uuid::from(*self).fmt(f)
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        uuid::Uuid::from(*self).fmt(f)
    }
}

impl From<uuid::Uuid> for Guid {
    fn from(u: uuid::Uuid) -> Self {
        let (a, b, c, d) = u.as_fields();
        Guid::from_fields(a, b, c, d)
    }
}

impl From<Guid> for uuid::Uuid {
    fn from(g: Guid) -> Self {
        let (a, b, c, d) = g.to_fields();
        uuid::Uuid::from_fields(a, b, c, &d)
    }
}

impl AsRef<[u8]> for Guid {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::str::FromStr for Guid {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guid::parse_str(s)
    }
}

impl Default for Guid {
    #[inline]
    fn default() -> Self {
        Guid::nil()
    }
}
