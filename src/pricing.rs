//! Display derivations over raw on-chain amounts.
//!
//! Everything here is a pure, total function: math happens in the integer
//! domain on the raw fixed-point values, and floats appear only at the
//! final display-rounding step.

use alloy_primitives::U256;

/// Heat score at which the progress meter reads 100%.
pub const MAX_HEAT: u64 = 150_000;

/// Ceiling of the progress meter; heat can overshoot 100% up to here.
pub const HEAT_PROGRESS_CAP: u64 = 150;

/// Chainlink prices carry 8 decimals; wei carries 18. USD conversion
/// divides the product by 10^26.
const WEI_USD_DIVISOR_EXP: u64 = 26;

/// Direction of the current price relative to base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// The heat-driven premium over base price: magnitude plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatBonus {
    /// |current - base| in wei
    pub amount: U256,
    pub trend: Trend,
}

impl HeatBonus {
    pub fn zero() -> Self {
        Self { amount: U256::ZERO, trend: Trend::Flat }
    }
}

/// Premium of the current mint price over the base price. Zero when either
/// input is absent.
pub fn heat_bonus(current: Option<U256>, base: Option<U256>) -> HeatBonus {
    let (current, base) = match (current, base) {
        (Some(c), Some(b)) => (c, b),
        _ => return HeatBonus::zero(),
    };

    if current > base {
        HeatBonus { amount: current - base, trend: Trend::Up }
    } else if current < base {
        HeatBonus { amount: base - current, trend: Trend::Down }
    } else {
        HeatBonus::zero()
    }
}

/// Percentage change of current over base, in whole percentage points.
/// Exactly 0 when base is zero or either input is absent. Saturates at
/// `i64` bounds for degenerate inputs.
pub fn percentage_change(current: Option<U256>, base: Option<U256>) -> i64 {
    let (current, base) = match (current, base) {
        (Some(c), Some(b)) if !b.is_zero() => (c, b),
        _ => return 0,
    };

    let (diff, negative) = if current >= base {
        (current - base, false)
    } else {
        (base - current, true)
    };

    let points = diff
        .checked_mul(U256::from(100u64))
        .map(|scaled| scaled / base)
        .unwrap_or(U256::MAX);
    let points = u64::try_from(points).unwrap_or(u64::MAX);
    let points = i64::try_from(points).unwrap_or(i64::MAX);

    if negative {
        -points
    } else {
        points
    }
}

/// Heat progress toward `MAX_HEAT` as a percentage, capped at 150 so the
/// meter can overshoot 100% but never run away.
pub fn heat_progress(heat: Option<U256>) -> u64 {
    let heat = match heat {
        Some(h) => h,
        None => return 0,
    };

    let progress = heat
        .checked_mul(U256::from(100u64))
        .map(|scaled| scaled / U256::from(MAX_HEAT))
        .unwrap_or(U256::MAX);

    u64::try_from(progress)
        .unwrap_or(u64::MAX)
        .min(HEAT_PROGRESS_CAP)
}

/// Convert a wei amount to USD using an 8-decimal oracle price. The
/// division happens last, on the full-precision product.
pub fn wei_to_usd(wei: U256, price_8dp: U256) -> f64 {
    let divisor = U256::from(10u64).pow(U256::from(WEI_USD_DIVISOR_EXP));
    let product = match wei.checked_mul(price_8dp) {
        Some(p) => p,
        None => return f64::INFINITY,
    };
    let whole = product / divisor;
    // two decimals of sub-dollar precision for display rounding
    let cents = (product % divisor) * U256::from(100u64) / divisor;

    let whole = u128::try_from(whole).unwrap_or(u128::MAX) as f64;
    let cents = u64::try_from(cents).unwrap_or(0) as f64;
    whole + cents / 100.0
}

/// Format a USD value as `$1,234.56`.
pub fn format_usd(value: f64) -> String {
    let negative = value < 0.0;
    let value = value.abs();
    let whole = value.trunc() as u128;
    let cents = ((value - value.trunc()) * 100.0).round() as u64;
    let (whole, cents) = if cents >= 100 { (whole + 1, 0) } else { (whole, cents) };

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents)
}

/// Format an 18-decimal token amount compactly: `<0.01`, `12.34`,
/// `56.70K`, `1.20M`.
pub fn format_token_amount(wei: U256) -> String {
    let scale = U256::from(10u64).pow(U256::from(18u64));
    let whole = u128::try_from(wei / scale).unwrap_or(u128::MAX);
    let frac = u128::try_from(wei % scale).unwrap_or(0);
    let value = whole as f64 + frac as f64 / 1e18;

    if value == 0.0 {
        return "0".to_string();
    }
    if value < 0.01 {
        return "<0.01".to_string();
    }
    if value >= 1_000_000.0 {
        return format!("{:.2}M", value / 1_000_000.0);
    }
    if value >= 1_000.0 {
        return format!("{:.2}K", value / 1_000.0);
    }
    format!("{:.2}", value)
}

/// Format a heat score with thousands separators.
pub fn format_heat_score(heat: U256) -> String {
    let digits = heat.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> Option<U256> {
        Some(U256::from(v))
    }

    #[test]
    fn test_heat_bonus_basic() {
        let bonus = heat_bonus(u(120), u(100));
        assert_eq!(bonus.amount, U256::from(20u64));
        assert_eq!(bonus.trend, Trend::Up);
    }

    #[test]
    fn test_heat_bonus_negative_and_flat() {
        let bonus = heat_bonus(u(80), u(100));
        assert_eq!(bonus.amount, U256::from(20u64));
        assert_eq!(bonus.trend, Trend::Down);

        assert_eq!(heat_bonus(u(100), u(100)), HeatBonus::zero());
    }

    #[test]
    fn test_heat_bonus_absent_inputs() {
        assert_eq!(heat_bonus(None, u(100)), HeatBonus::zero());
        assert_eq!(heat_bonus(u(100), None), HeatBonus::zero());
        assert_eq!(heat_bonus(None, None), HeatBonus::zero());
    }

    #[test]
    fn test_percentage_change_basic() {
        assert_eq!(percentage_change(u(120), u(100)), 20);
        assert_eq!(percentage_change(u(80), u(100)), -20);
        assert_eq!(percentage_change(u(100), u(100)), 0);
    }

    #[test]
    fn test_percentage_change_zero_or_absent_base() {
        // exactly 0 for any current when base is zero or missing
        assert_eq!(percentage_change(u(123_456), u(0)), 0);
        assert_eq!(percentage_change(u(123_456), None), 0);
        assert_eq!(percentage_change(None, u(100)), 0);
    }

    #[test]
    fn test_percentage_change_integer_domain() {
        // 1.5e18 over 1e18: the integer math must see 50, not 0
        let base = U256::from(10u64).pow(U256::from(18u64));
        let current = base + base / U256::from(2u64);
        assert_eq!(percentage_change(Some(current), Some(base)), 50);
    }

    #[test]
    fn test_heat_progress_cap() {
        assert_eq!(heat_progress(u(0)), 0);
        assert_eq!(heat_progress(u(75_000)), 50);
        assert_eq!(heat_progress(u(150_000)), 100);
        assert_eq!(heat_progress(u(225_000)), 150);
        // far beyond the ceiling still reads 150
        assert_eq!(heat_progress(u(u64::MAX)), 150);
        assert_eq!(heat_progress(Some(U256::MAX)), 150);
        assert_eq!(heat_progress(None), 0);
    }

    #[test]
    fn test_wei_to_usd() {
        // 1.5 ETH at $2,500.00 (8 decimals) = $3,750.00
        let wei = U256::from(10u64).pow(U256::from(18u64)) * U256::from(15u64)
            / U256::from(10u64);
        let price = U256::from(2_500u64) * U256::from(10u64).pow(U256::from(8u64));
        let usd = wei_to_usd(wei, price);
        assert!((usd - 3750.0).abs() < 0.01);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(2500.0), "$2,500.00");
        assert_eq!(format_usd(1234.567), "$1,234.57");
        assert_eq!(format_usd(0.5), "$0.50");
        assert_eq!(format_usd(1_000_000.0), "$1,000,000.00");
    }

    #[test]
    fn test_format_token_amount() {
        let one = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(format_token_amount(U256::ZERO), "0");
        assert_eq!(format_token_amount(one / U256::from(1000u64)), "<0.01");
        assert_eq!(format_token_amount(one * U256::from(12u64)), "12.00");
        assert_eq!(format_token_amount(one * U256::from(56_700u64)), "56.70K");
        assert_eq!(format_token_amount(one * U256::from(1_200_000u64)), "1.20M");
    }

    #[test]
    fn test_format_heat_score() {
        assert_eq!(format_heat_score(U256::from(0u64)), "0");
        assert_eq!(format_heat_score(U256::from(999u64)), "999");
        assert_eq!(format_heat_score(U256::from(150_000u64)), "150,000");
        assert_eq!(format_heat_score(U256::from(1_234_567u64)), "1,234,567");
    }
}
