// crates/mana-balance/src/calculator.rs
//
// Integer half-life calculator for mana decay and accrual.
//
// Erosion halves a balance every `half_life` time units. Whole half-lives are
// applied as right shifts; the remaining fraction of a half-life is
// interpolated linearly between 1 and 1/2. Accrual is linear in coins held
// and time held, scaled by a rational rate. No floating point is involved,
// so results are bit-identical on every platform.

use serde::{Deserialize, Serialize};

use mana_core::{ManaCalculator, ManaError, Mana, RoundingError};

/// Deterministic half-life decay with linear accrual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalfLifeCalculator {
    /// Time units for a balance to halve. `None` disables erosion.
    half_life: Option<u64>,
    /// Mana generated per coin per time unit, as numerator / denominator.
    generation_numerator: u64,
    generation_denominator: u64,
}

impl HalfLifeCalculator {
    /// # Errors
    /// Returns `ManaError::Config` if `generation_denominator` is zero.
    pub fn new(
        half_life: Option<u64>,
        generation_numerator: u64,
        generation_denominator: u64,
    ) -> Result<Self, ManaError> {
        if generation_denominator == 0 {
            return Err(ManaError::Config(
                "generation_denominator must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            half_life,
            generation_numerator,
            generation_denominator,
        })
    }

    pub fn half_life(&self) -> Option<u64> {
        self.half_life
    }
}

impl ManaCalculator for HalfLifeCalculator {
    fn erode_mana(&self, balance: Mana, elapsed: u64) -> (Mana, RoundingError) {
        let half_life = match self.half_life {
            Some(h) => h,
            None => return (balance, 0),
        };
        if elapsed == 0 {
            return (balance, 0);
        }
        if half_life == 0 {
            return (0, balance);
        }

        let halvings = elapsed / half_life;
        if halvings >= 64 {
            return (0, balance);
        }
        let shifted = balance >> halvings;
        let shift_residue = balance - (shifted << halvings);

        // shifted * (1 - remainder / (2 * half_life))
        let remainder = elapsed % half_life;
        let numerator = shifted as u128 * remainder as u128;
        let denominator = 2 * half_life as u128;
        let lost = (numerator / denominator) as u64;
        let residue = u64::try_from(numerator % denominator).unwrap_or(u64::MAX);

        (shifted - lost, shift_residue.saturating_add(residue))
    }

    fn generate_mana(&self, moved_coins: u64, held_time: u64) -> (Mana, RoundingError) {
        let product = (moved_coins as u128)
            .checked_mul(held_time as u128)
            .and_then(|p| p.checked_mul(self.generation_numerator as u128));
        let product = match product {
            Some(p) => p,
            None => return (Mana::MAX, 0),
        };

        let denominator = self.generation_denominator as u128;
        let gain = u64::try_from(product / denominator).unwrap_or(Mana::MAX);
        let residue = (product % denominator) as u64;
        (gain, residue)
    }
}
