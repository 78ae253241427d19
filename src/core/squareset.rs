// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::core::{self, File, Rank, Square};
use std::fmt;
use std::ops;

/// A set of squares on the chessboard, one bit per square in FEN order. The implementation of SquareSet is designed
/// to mirror [`std::collections::HashSet`], but stores squares as a single 64-bit mask.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SquareSet(u64);

impl SquareSet {
    /// Creates a new, empty SquareSet.
    pub const fn empty() -> SquareSet {
        SquareSet(0)
    }

    /// Creates a new SquareSet with all squares present in the set.
    pub const fn all() -> SquareSet {
        SquareSet(0xFFFFFFFFFFFFFFFF)
    }

    pub const fn from_bits(bits: u64) -> SquareSet {
        SquareSet(bits)
    }

    pub const fn single(square: Square) -> SquareSet {
        SquareSet(1u64 << square.0)
    }

    /// Tests whether or not the given square is contained within this SquareSet.
    pub const fn contains(&self, square: Square) -> bool {
        self.0 & (1u64 << square.0) != 0
    }

    pub fn insert(&mut self, square: Square) {
        self.0 |= 1u64 << square.0;
    }

    pub fn remove(&mut self, square: Square) {
        self.0 &= !(1u64 << square.0);
    }

    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the only square in the set, or `None` if the set is empty or holds more than one square.
    pub fn single_square(self) -> Option<Square> {
        if self.len() == 1 {
            Some(Square(self.0.trailing_zeros() as u8))
        } else {
            None
        }
    }

    pub const fn and(self, other: SquareSet) -> SquareSet {
        SquareSet(self.0 & other.0)
    }

    pub const fn or(self, other: SquareSet) -> SquareSet {
        SquareSet(self.0 | other.0)
    }

    pub const fn not(self) -> SquareSet {
        SquareSet(!self.0)
    }

    pub const fn rank(self, rank: Rank) -> SquareSet {
        self.and(SquareSet(0xFF << ((7 - rank.as_u8()) * 8)))
    }

    pub const fn file(self, file: File) -> SquareSet {
        self.and(SquareSet(SS_FILE_A.0 << file.as_u8()))
    }

    pub const fn bits(self) -> u64 {
        self.0
    }
}

impl ops::BitOr for SquareSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl ops::BitOrAssign for SquareSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl ops::Not for SquareSet {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.not()
    }
}

impl ops::BitAnd for SquareSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl IntoIterator for SquareSet {
    type Item = Square;
    type IntoIter = SquareSetIterator;

    fn into_iter(self) -> Self::IntoIter {
        SquareSetIterator(self.0)
    }
}

impl FromIterator<Square> for SquareSet {
    fn from_iter<I: IntoIterator<Item = Square>>(iter: I) -> Self {
        let mut set = SquareSet::empty();
        for sq in iter {
            set.insert(sq);
        }
        set
    }
}

impl fmt::Display for SquareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in core::ranks().rev() {
            for file in core::files() {
                let sq = Square::of(rank, file);
                if self.contains(sq) {
                    write!(f, " 1 ")?;
                } else {
                    write!(f, " . ")?;
                }
            }

            writeln!(f, "| {}", rank)?;
        }

        for _ in core::files() {
            write!(f, "---")?;
        }

        writeln!(f)?;
        for file in core::files() {
            write!(f, " {} ", file)?;
        }

        writeln!(f)?;
        Ok(())
    }
}

pub const SS_RANK_8: SquareSet = SquareSet(0x00000000000000FF);
pub const SS_RANK_7: SquareSet = SquareSet(0x000000000000FF00);
pub const SS_RANK_6: SquareSet = SquareSet(0x0000000000FF0000);
pub const SS_RANK_5: SquareSet = SquareSet(0x00000000FF000000);
pub const SS_RANK_4: SquareSet = SquareSet(0x000000FF00000000);
pub const SS_RANK_3: SquareSet = SquareSet(0x0000FF0000000000);
pub const SS_RANK_2: SquareSet = SquareSet(0x00FF000000000000);
pub const SS_RANK_1: SquareSet = SquareSet(0xFF00000000000000);
pub const SS_FILE_A: SquareSet = SquareSet(0x0101010101010101);
pub const SS_FILE_B: SquareSet = SquareSet(0x0202020202020202);
pub const SS_FILE_C: SquareSet = SquareSet(0x0404040404040404);
pub const SS_FILE_D: SquareSet = SquareSet(0x0808080808080808);
pub const SS_FILE_E: SquareSet = SquareSet(0x1010101010101010);
pub const SS_FILE_F: SquareSet = SquareSet(0x2020202020202020);
pub const SS_FILE_G: SquareSet = SquareSet(0x4040404040404040);
pub const SS_FILE_H: SquareSet = SquareSet(0x8080808080808080);

/// An iterator over squares stored in a [`SquareSet`], lowest index (nearest a8) first.
pub struct SquareSetIterator(u64);

impl Iterator for SquareSetIterator {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            None
        } else {
            let next = self.0.trailing_zeros() as u8;
            self.0 &= self.0 - 1;
            Some(Square(next))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SquareSet;
    use crate::core::*;

    #[test]
    fn test_set_clear() {
        let mut set = SquareSet::empty();
        assert!(!set.contains(A1));
        set.insert(A1);
        assert!(set.contains(A1));
        set.remove(A1);
        assert!(!set.contains(A1));
    }

    #[test]
    fn bit_layout() {
        assert_eq!(1, SquareSet::single(A8).bits());
        assert_eq!(1 << 63, SquareSet::single(H1).bits());
    }

    #[test]
    fn iter_in_fen_order() {
        let set: SquareSet = [A3, A5, A4].into_iter().collect();
        let squares: Vec<_> = set.into_iter().collect();
        assert_eq!(squares, vec![A5, A4, A3]);
    }

    #[test]
    fn rank_and_file() {
        assert_eq!(SS_RANK_7, SquareSet::all().rank(RANK_7));
        assert_eq!(SS_RANK_1, SquareSet::all().rank(RANK_1));
        assert_eq!(SS_FILE_C, SquareSet::all().file(FILE_C));
    }

    #[test]
    fn single_square() {
        assert_eq!(Some(E4), SquareSet::single(E4).single_square());
        assert_eq!(None, SquareSet::empty().single_square());
        assert_eq!(None, SS_RANK_1.single_square());
    }
}
