//! # Identity Fingerprints
//!
//! A fingerprint names a prospective identity: one username connecting
//! from one address. It keys the verified cache and nothing else.
//!
//! ## Design
//!
//! - SipHash-2-4 with 128-bit output; stable across runs, not a secret
//! - Username and address are separated so `("ab", "c")` and `("a", "bc")` differ

use std::fmt;
use std::hash::Hasher;
use std::net::IpAddr;

use siphasher::sip128::{Hasher128, SipHasher24};

const KEY0: u64 = 0x6261_7374_696f_6e00;
const KEY1: u64 = 0x6669_6e67_6572_7072;

/// Deterministic digest of `(username, address)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Computes the fingerprint of a login.
    #[must_use]
    pub fn of(username: &str, address: IpAddr) -> Self {
        let mut hasher = SipHasher24::new_with_keys(KEY0, KEY1);
        hasher.write(username.as_bytes());
        hasher.write_u8(0xFF);
        match address {
            IpAddr::V4(v4) => hasher.write(&v4.octets()),
            IpAddr::V6(v6) => hasher.write(&v6.octets()),
        }
        Self(hasher.finish128().as_u128())
    }

    /// Raw digest.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const HOME: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(Fingerprint::of("Steve", HOME), Fingerprint::of("Steve", HOME));
    }

    #[test]
    fn test_fingerprint_depends_on_both_inputs() {
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert_ne!(Fingerprint::of("Steve", HOME), Fingerprint::of("Alex", HOME));
        assert_ne!(Fingerprint::of("Steve", HOME), Fingerprint::of("Steve", other));
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        let text = Fingerprint::of("Steve", HOME).to_string();
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
