//! Bet classification and settlement
//!
//! Pure, stateless rules for the eleven roulette bet categories. A set of
//! selected pockets is mapped to the geometric shape it forms on the 3×12
//! layout, then judged against a drawn pocket.
//!
//! Win checks for Street, Line, Dozen and the outside bets only look at the
//! first selected number plus a fixed offset. That is correct for shapes that
//! passed [`classify`], so winning is only exposed through [`ClassifiedBet`].

use crate::errors::BetError;
use crate::games::pocket::{self, Pocket};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Largest selection a single wager may carry (an even-money bet)
pub const MAX_BET_NUMBERS: usize = 18;

/// The eleven bet categories (ten payable shapes plus Invalid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetType {
    Straight,
    Split,
    Street,
    Corner,
    Line,
    Column,
    Dozen,
    #[serde(rename = "Odd/Even")]
    OddEven,
    #[serde(rename = "Red/Black")]
    RedBlack,
    #[serde(rename = "High/Low")]
    HighLow,
    Invalid,
}

impl BetType {
    pub const ALL_VALID: [BetType; 10] = [
        BetType::Straight,
        BetType::Split,
        BetType::Street,
        BetType::Corner,
        BetType::Line,
        BetType::Column,
        BetType::Dozen,
        BetType::OddEven,
        BetType::RedBlack,
        BetType::HighLow,
    ];

    /// Payout multiplier (X to 1); `None` for Invalid
    pub fn multiplier(self) -> Option<u64> {
        match self {
            BetType::Straight => Some(35),
            BetType::Split => Some(17),
            BetType::Street => Some(11),
            BetType::Corner => Some(8),
            BetType::Line => Some(5),
            BetType::Column | BetType::Dozen => Some(2),
            BetType::OddEven | BetType::RedBlack | BetType::HighLow => Some(1),
            BetType::Invalid => None,
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BetType::Straight => "Straight",
            BetType::Split => "Split",
            BetType::Street => "Street",
            BetType::Corner => "Corner",
            BetType::Line => "Line",
            BetType::Column => "Column",
            BetType::Dozen => "Dozen",
            BetType::OddEven => "Odd/Even",
            BetType::RedBlack => "Red/Black",
            BetType::HighLow => "High/Low",
            BetType::Invalid => "Invalid",
        };
        f.write_str(name)
    }
}

/// Map a selection of pockets to its bet type.
///
/// Numbers are judged in the order given: adjacency rules expect the lower
/// pocket first, and the first number anchors range-based shapes.
pub fn classify(numbers: &[i64]) -> Result<BetType, BetError> {
    if numbers.is_empty() {
        return Err(BetError::Empty);
    }
    if let Some(&bad) = numbers.iter().find(|&&n| !pocket::is_valid(n)) {
        return Err(BetError::NumberOutOfRange(bad));
    }

    let shape = match numbers.len() {
        1 => Some(BetType::Straight),
        2 if is_split(numbers) => Some(BetType::Split),
        3 if is_street(numbers) => Some(BetType::Street),
        4 if is_corner(numbers) => Some(BetType::Corner),
        6 if is_line(numbers) => Some(BetType::Line),
        12 if is_dozen(numbers) => Some(BetType::Dozen),
        12 if is_column(numbers) => Some(BetType::Column),
        18 if is_odd_even(numbers) => Some(BetType::OddEven),
        18 if is_red_black(numbers) => Some(BetType::RedBlack),
        18 if is_high_low(numbers) => Some(BetType::HighLow),
        _ => None,
    };

    shape.ok_or(BetError::InvalidCombination)
}

fn is_split(numbers: &[i64]) -> bool {
    let (n1, n2) = (numbers[0], numbers[1]);

    // horizontal neighbours within one row
    if n1 + 1 == n2 && n1 % 3 != 0 {
        return true;
    }
    // vertical neighbours
    if n1 + 3 == n2 {
        return true;
    }
    n1 == 0 && (1..=3).contains(&n2)
}

fn is_street(numbers: &[i64]) -> bool {
    if matches!(numbers, [0, 1, 2] | [0, 2, 3]) {
        return true;
    }
    let n1 = numbers[0];
    numbers[1] == n1 + 1 && numbers[2] == n1 + 2 && pocket::is_row_start(n1)
}

fn is_corner(numbers: &[i64]) -> bool {
    if matches!(numbers, [0, 1, 2, 3]) {
        return true;
    }
    let n = numbers[0];
    [n, n + 1, n + 3, n + 4].iter().all(|c| numbers.contains(c))
}

fn is_line(numbers: &[i64]) -> bool {
    numbers.windows(2).all(|w| w[1] == w[0] + 1) && pocket::is_row_start(numbers[0])
}

/// Every number satisfies `member` and the selection covers `required` exactly
fn covers(numbers: &[i64], member: impl Fn(i64) -> bool, required: impl Iterator<Item = i64>) -> bool {
    if !numbers.iter().all(|&n| member(n)) {
        return false;
    }
    let chosen: HashSet<i64> = numbers.iter().copied().collect();
    let required: HashSet<i64> = required.collect();
    chosen == required
}

fn is_dozen(numbers: &[i64]) -> bool {
    let Some(block) = pocket::dozen(numbers[0]) else {
        return false;
    };
    let lo = (block as i64 - 1) * 12 + 1;
    let hi = lo + 11;
    covers(numbers, |n| (lo..=hi).contains(&n), lo..=hi)
}

fn is_column(numbers: &[i64]) -> bool {
    let Some(col) = pocket::column(numbers[0]) else {
        return false;
    };
    covers(numbers, |n| pocket::column(n) == Some(col), (col as i64..=36).step_by(3))
}

fn is_odd_even(numbers: &[i64]) -> bool {
    let odd = pocket::is_odd(numbers[0]);
    let start = if odd { 1 } else { 2 };
    covers(numbers, |n| n != 0 && pocket::is_odd(n) == odd, (start..=36).step_by(2))
}

fn is_red_black(numbers: &[i64]) -> bool {
    let color = pocket::color(numbers[0]);
    covers(
        numbers,
        |n| pocket::color(n) == color,
        (1..=36).filter(|&n| pocket::color(n) == color),
    )
}

fn is_high_low(numbers: &[i64]) -> bool {
    if numbers[0] == 0 {
        return false;
    }
    let low = pocket::is_low(numbers[0]);
    let half = if low { 1..=18 } else { 19..=36 };
    covers(numbers, |n| n != 0 && pocket::is_low(n) == low, half)
}

/// Whether a classified selection wins against the drawn pocket.
///
/// A drawn zero overrides every shape: the wager wins only when its first
/// number is itself zero.
fn check_win(bet_type: BetType, numbers: &[i64], drawn: i64) -> bool {
    let Some(&first) = numbers.first() else {
        return false;
    };
    if drawn == 0 {
        return first == 0;
    }

    match bet_type {
        BetType::Straight => numbers.len() == 1 && first == drawn,
        BetType::Split | BetType::Corner => numbers.contains(&drawn),
        BetType::Street => {
            if first == 0 {
                numbers.contains(&drawn)
            } else {
                (first..=first + 2).contains(&drawn)
            }
        }
        BetType::Line => (first..=first + 5).contains(&drawn),
        BetType::Dozen => (first..=first + 11).contains(&drawn),
        BetType::Column => drawn % 3 == first % 3,
        BetType::OddEven => pocket::is_odd(drawn) == pocket::is_odd(first),
        BetType::RedBlack => pocket::color(drawn) == pocket::color(first),
        BetType::HighLow => pocket::is_low(drawn) == pocket::is_low(first),
        BetType::Invalid => false,
    }
}

/// Stake returned on a win: `amount * (multiplier + 1)`, zero for Invalid
pub fn payout(bet_type: BetType, amount: u64) -> u64 {
    match bet_type.multiplier() {
        Some(multiplier) => amount.saturating_mul(multiplier + 1),
        None => 0,
    }
}

/// A selection that has passed [`classify`].
///
/// Deserializing re-runs classification, so a bet received over the wire is
/// never trusted for its claimed type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BetRepr")]
pub struct ClassifiedBet {
    numbers: Vec<Pocket>,
    bet_type: BetType,
}

#[derive(Deserialize)]
struct BetRepr {
    numbers: Vec<i64>,
    bet_type: BetType,
}

impl TryFrom<BetRepr> for ClassifiedBet {
    type Error = BetError;

    fn try_from(repr: BetRepr) -> Result<Self, Self::Error> {
        let bet = ClassifiedBet::new(&repr.numbers)?;
        if bet.bet_type != repr.bet_type {
            return Err(BetError::InvalidCombination);
        }
        Ok(bet)
    }
}

impl ClassifiedBet {
    pub fn new(numbers: &[i64]) -> Result<Self, BetError> {
        if numbers.len() > MAX_BET_NUMBERS {
            return Err(BetError::TooManyNumbers {
                count: numbers.len(),
                max: MAX_BET_NUMBERS,
            });
        }
        let bet_type = classify(numbers)?;
        // in range: classify rejected anything outside 0..=36
        let mut numbers: Vec<Pocket> = numbers.iter().map(|&n| n as Pocket).collect();
        // Outside bets never hold zero and accept any order, so store them
        // ascending: the first number then anchors the Dozen range.
        if matches!(
            bet_type,
            BetType::Dozen | BetType::Column | BetType::OddEven | BetType::RedBlack | BetType::HighLow
        ) {
            numbers.sort_unstable();
        }
        Ok(Self { numbers, bet_type })
    }

    pub fn numbers(&self) -> &[Pocket] {
        &self.numbers
    }

    pub fn bet_type(&self) -> BetType {
        self.bet_type
    }

    pub fn wins(&self, drawn: Pocket) -> bool {
        let numbers: Vec<i64> = self.numbers.iter().map(|&n| n as i64).collect();
        check_win(self.bet_type, &numbers, drawn as i64)
    }

    pub fn payout(&self, amount: u64) -> u64 {
        payout(self.bet_type, amount)
    }

    /// Amount returned for `amount` staked when `drawn` comes up
    pub fn settle(&self, amount: u64, drawn: Pocket) -> (bool, u64) {
        if self.wins(drawn) {
            (true, self.payout(amount))
        } else {
            (false, 0)
        }
    }
}

/// One canonical selection per payable bet type
pub fn canonical_selection(bet_type: BetType) -> Vec<i64> {
    match bet_type {
        BetType::Straight => vec![1],
        BetType::Split => vec![1, 2],
        BetType::Street => vec![1, 2, 3],
        BetType::Corner => vec![1, 2, 4, 5],
        BetType::Line => (1..=6).collect(),
        BetType::Dozen => (1..=12).collect(),
        BetType::Column => (1..=34).step_by(3).collect(),
        BetType::OddEven => (1..=35).step_by(2).collect(),
        BetType::RedBlack => pocket::RED_POCKETS.iter().map(|&n| n as i64).collect(),
        BetType::HighLow => (1..=18).collect(),
        BetType::Invalid => vec![],
    }
}
