//! Entry gate of the withdrawal options screen

use rewards_core::Coins;

/// Balance required before any payout option is offered.
///
/// Separate from the per-product minimum enforced by the payout validator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalGate {
    minimum: Coins,
}

impl WithdrawalGate {
    pub fn new(minimum: Coins) -> Self {
        Self { minimum }
    }

    pub fn minimum(&self) -> Coins {
        self.minimum
    }

    pub fn allows(&self, balance: Coins) -> bool {
        balance.as_f64() >= self.minimum.as_f64()
    }

    /// Coins still needed to open the withdrawal options
    pub fn shortfall(&self, balance: Coins) -> Coins {
        Coins((self.minimum.as_f64() - balance.as_f64()).max(0.0))
    }
}

impl Default for WithdrawalGate {
    fn default() -> Self {
        Self::new(Coins(20.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_at_twenty_coins() {
        let gate = WithdrawalGate::default();
        assert!(!gate.allows(Coins(19.5)));
        assert!(gate.allows(Coins(20.0)));
        assert_eq!(gate.shortfall(Coins(12.0)), Coins(8.0));
        assert_eq!(gate.shortfall(Coins(40.0)), Coins(0.0));
    }
}
