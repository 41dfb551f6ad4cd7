//! Local spin allowance check

use rewards_core::{Failure, SpinAllowance};

pub const NO_SPINS_MESSAGE: &str = "No spins remaining today.";

/// Refuse a spin when the last known status says none remain.
///
/// With no status loaded yet the server decides.
pub fn check_spin_allowed(last_known: Option<&SpinAllowance>) -> Result<(), Failure> {
    match last_known {
        Some(allowance) if !allowance.allows_spin() => {
            let message = if allowance.cooldown_seconds > 0 {
                format!(
                    "{} Next spin in {}.",
                    NO_SPINS_MESSAGE,
                    format_cooldown(allowance.cooldown_seconds)
                )
            } else {
                NO_SPINS_MESSAGE.to_string()
            };
            Err(Failure::precondition(message))
        }
        _ => Ok(()),
    }
}

/// `HH:MM:SS`
fn format_cooldown(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
