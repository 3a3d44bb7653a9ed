//! Seam to the phantom address-selection oracle.

use std::net::IpAddr;

/// Picks the phantom address a client will connect to.
///
/// The selection algorithm lives outside this crate; the registration core
/// only needs the same answer the client computed from its seed.
#[cfg_attr(test, mockall::automock)]
pub trait AddressSelector: Send + Sync {
    fn select(
        &self,
        seed: &[u8],
        decoy_list_generation: u32,
        v6_support: bool,
    ) -> anyhow::Result<IpAddr>;
}
