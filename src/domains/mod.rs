//! Domain event sources.
//!
//! One source per producer binary. Each is a plain `EventSource` with its
//! own record type; randomized sources take an injectable RNG so tests can
//! seed them.

mod billing;
mod delivery;
mod inventory;
mod orders;

pub use billing::{BillingSource, Invoice};
pub use delivery::{DeliveryOrder, DeliverySource};
pub use inventory::{InventoryAlert, InventorySource};
pub use orders::{Order, OrderSource};

use rand::seq::IndexedRandom;
use rand::Rng;

/// Customers shared by the billing and delivery sources.
pub const CUSTOMERS: &[&str] = &["Laura", "Yeison", "Santiago", "María", "Carlos"];

/// Pick one entry from a non-empty list.
fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[&'static str]) -> &'static str {
    options.choose(rng).copied().unwrap_or_default()
}

/// Round to cents.
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_returns_member() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(CUSTOMERS.contains(&pick(&mut rng, CUSTOMERS)));
        }
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(3.14159), 3.14);
        assert_eq!(round_cents(2.5), 2.5);
        assert_eq!(round_cents(10.005_1), 10.01);
    }
}
