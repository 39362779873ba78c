//! Human-readable amounts, multipliers and outcome messages.

use crate::events::{
    SpinOutcome,
    Symbol,
    WinCategory,
};
use chrono::{
    DateTime,
    Utc,
};
use ethers::types::U256;

const ETHER_DECIMALS: usize = 18;

/// Decimals shown for `amount` wei: more for dust, fewer for large sums.
pub fn display_decimals(amount: U256) -> usize {
    if amount < U256::exp10(14) {
        6
    } else if amount < U256::exp10(16) {
        4
    } else if amount < U256::exp10(18) {
        3
    } else if amount < U256::exp10(20) {
        2
    } else {
        1
    }
}

pub fn format_eth(amount: U256) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    format_eth_fixed(amount, display_decimals(amount))
}

/// `amount` wei in ether, rounded half up to `decimals` places.
pub fn format_eth_fixed(amount: U256, decimals: usize) -> String {
    let decimals = decimals.min(ETHER_DECIMALS);
    let unit = U256::exp10(ETHER_DECIMALS - decimals);
    let rounded = amount.saturating_add(unit / 2) / unit;
    let scale = U256::exp10(decimals);
    let whole = rounded / scale;
    if decimals == 0 {
        return whole.to_string();
    }
    let fraction = (rounded % scale).to_string();
    format!("{whole}.{}{fraction}", "0".repeat(decimals - fraction.len()))
}

pub fn format_eth_with_symbol(amount: U256) -> String {
    format!("{} ETH", format_eth(amount))
}

/// Multiplier as players read it. Double matches are encoded in hundredths.
pub fn display_multiplier(outcome: &SpinOutcome) -> String {
    if !outcome.win_type.contains("DOUBLE") {
        return outcome.multiplier.to_string();
    }
    let hundred = U256::from(100);
    let whole = outcome.multiplier / hundred;
    let cents = (outcome.multiplier % hundred).as_u64();
    match cents {
        0 => whole.to_string(),
        cents if cents % 10 == 0 => format!("{whole}.{}", cents / 10),
        cents => format!("{whole}.{cents:02}"),
    }
}

pub fn win_message(outcome: &SpinOutcome) -> String {
    let payout = format_eth_fixed(outcome.payout, 3);
    match outcome.category() {
        WinCategory::NoWin => "Try again!".to_string(),
        WinCategory::Jackpot => format!("JACKPOT! You won {payout} ETH!"),
        WinCategory::DoubleMatch | WinCategory::TripleMatch => {
            let label = if outcome.win_type.is_empty() {
                "WIN"
            } else {
                outcome.win_type.as_str()
            };
            format!(
                "{label}! You won {payout} ETH! ({}x)",
                display_multiplier(outcome)
            )
        }
    }
}

/// Reel glyphs separated by bars. Unknown codes show as `?`.
pub fn reels_line(reels: [u8; 3]) -> String {
    reels
        .map(|code| Symbol::from_code(code).map_or("?", Symbol::glyph))
        .join(" | ")
}

/// Coarse age of a contract timestamp (seconds since the epoch).
pub fn time_ago(timestamp: U256, now: DateTime<Utc>) -> String {
    let timestamp = i64::try_from(timestamp.low_u64()).unwrap_or(i64::MAX);
    let Some(then) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
        return "Right now".to_string();
    };
    let elapsed = now.signed_duration_since(then);
    if elapsed.num_days() > 0 {
        format!("{} days ago", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{} hours ago", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{} mins ago", elapsed.num_minutes())
    } else if elapsed.num_seconds() > 0 {
        format!("{} sec ago", elapsed.num_seconds())
    } else {
        "Right now".to_string()
    }
}
