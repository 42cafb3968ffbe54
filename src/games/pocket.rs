//! Pocket attributes on the single-zero 3×12 layout
//!
//! Attributes are derived from the pocket number, never stored. Zero is
//! colorless and belongs to no parity, half, dozen or column.

use serde::{Deserialize, Serialize};

/// A pocket number in `0..=MAX_POCKET`
pub type Pocket = u8;

/// Number of pockets on the wheel (0-36)
pub const POCKET_COUNT: u32 = 37;

pub const MAX_POCKET: Pocket = 36;

/// The 18 red pockets; every other non-zero pocket is black
pub const RED_POCKETS: [Pocket; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
    Green,
}

pub fn is_valid(n: i64) -> bool {
    (0..=MAX_POCKET as i64).contains(&n)
}

pub fn is_red(n: i64) -> bool {
    RED_POCKETS.iter().any(|&r| r as i64 == n)
}

pub fn color(n: i64) -> Color {
    if n == 0 {
        Color::Green
    } else if is_red(n) {
        Color::Red
    } else {
        Color::Black
    }
}

pub fn is_odd(n: i64) -> bool {
    n % 2 == 1
}

/// Low half is 1-18, high half 19-36
pub fn is_low(n: i64) -> bool {
    (1..=18).contains(&n)
}

/// Dozen block 1, 2 or 3; `None` for zero
pub fn dozen(n: i64) -> Option<u8> {
    match n {
        1..=12 => Some(1),
        13..=24 => Some(2),
        25..=36 => Some(3),
        _ => None,
    }
}

/// Column 1, 2 or 3 (column 3 holds the multiples of three); `None` for zero
pub fn column(n: i64) -> Option<u8> {
    if n <= 0 || n > MAX_POCKET as i64 {
        return None;
    }
    match n % 3 {
        1 => Some(1),
        2 => Some(2),
        _ => Some(3),
    }
}

/// A row of the layout starts at 1, 4, 7, ... 34
pub fn is_row_start(n: i64) -> bool {
    n % 3 == 1
}
