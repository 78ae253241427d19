// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{fmt, str::FromStr};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SquareParseError {
    #[error("square index out of range: {0}")]
    OutOfRange(u8),
    #[error("invalid square name: {0}")]
    InvalidName(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankParseError {
    #[error("rank index out of range: {0}")]
    OutOfRange(u8),
    #[error("invalid char: {0}")]
    InvalidChar(char),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileParseError {
    #[error("file index out of range: {0}")]
    OutOfRange(u8),
    #[error("invalid char: {0}")]
    InvalidChar(char),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PieceParseError {
    #[error("invalid char: {0}")]
    InvalidChar(char),
}

/// A square on the chessboard, numbered in FEN order: a8 is 0, h8 is 7, a1 is 56 and h1 is 63. Bit `i` of a
/// [`SquareSet`](crate::core::SquareSet) corresponds to square `i`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(pub(in crate::core) u8);

impl Square {
    /// Returns the rank of this square on the chessboard.
    pub const fn rank(self) -> Rank {
        Rank(7 - (self.0 >> 3))
    }

    /// Returns the file of this square on the chessboard.
    pub const fn file(self) -> File {
        File(self.0 & 7)
    }

    /// Creates a new Square composed of a given rank and file.
    pub const fn of(rank: Rank, file: File) -> Square {
        Square((7 - rank.0) * 8 + file.0)
    }

    pub(in crate::core) const fn plus(self, offset: i32) -> Square {
        Square((self.0 as i32 + offset) as u8)
    }

    /// Returns the closest square in the given direction. Invalid if the requested direction goes off of the
    /// board.
    pub const fn towards(self, dir: Direction) -> Square {
        self.plus(dir.as_vector())
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Square {
    type Error = SquareParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value >= 64 {
            return Err(SquareParseError::OutOfRange(value));
        }

        Ok(Square(value))
    }
}

impl FromStr for Square {
    type Err = SquareParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(r), None) => {
                let file = File::try_from(f).map_err(|_| SquareParseError::InvalidName(s.into()))?;
                let rank = Rank::try_from(r).map_err(|_| SquareParseError::InvalidName(s.into()))?;
                Ok(Square::of(rank, file))
            }
            _ => Err(SquareParseError::InvalidName(s.into())),
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

pub const A8: Square = Square(0);
pub const B8: Square = Square(1);
pub const C8: Square = Square(2);
pub const D8: Square = Square(3);
pub const E8: Square = Square(4);
pub const F8: Square = Square(5);
pub const G8: Square = Square(6);
pub const H8: Square = Square(7);
pub const A7: Square = Square(8);
pub const B7: Square = Square(9);
pub const C7: Square = Square(10);
pub const D7: Square = Square(11);
pub const E7: Square = Square(12);
pub const F7: Square = Square(13);
pub const G7: Square = Square(14);
pub const H7: Square = Square(15);
pub const A6: Square = Square(16);
pub const B6: Square = Square(17);
pub const C6: Square = Square(18);
pub const D6: Square = Square(19);
pub const E6: Square = Square(20);
pub const F6: Square = Square(21);
pub const G6: Square = Square(22);
pub const H6: Square = Square(23);
pub const A5: Square = Square(24);
pub const B5: Square = Square(25);
pub const C5: Square = Square(26);
pub const D5: Square = Square(27);
pub const E5: Square = Square(28);
pub const F5: Square = Square(29);
pub const G5: Square = Square(30);
pub const H5: Square = Square(31);
pub const A4: Square = Square(32);
pub const B4: Square = Square(33);
pub const C4: Square = Square(34);
pub const D4: Square = Square(35);
pub const E4: Square = Square(36);
pub const F4: Square = Square(37);
pub const G4: Square = Square(38);
pub const H4: Square = Square(39);
pub const A3: Square = Square(40);
pub const B3: Square = Square(41);
pub const C3: Square = Square(42);
pub const D3: Square = Square(43);
pub const E3: Square = Square(44);
pub const F3: Square = Square(45);
pub const G3: Square = Square(46);
pub const H3: Square = Square(47);
pub const A2: Square = Square(48);
pub const B2: Square = Square(49);
pub const C2: Square = Square(50);
pub const D2: Square = Square(51);
pub const E2: Square = Square(52);
pub const F2: Square = Square(53);
pub const G2: Square = Square(54);
pub const H2: Square = Square(55);
pub const A1: Square = Square(56);
pub const B1: Square = Square(57);
pub const C1: Square = Square(58);
pub const D1: Square = Square(59);
pub const E1: Square = Square(60);
pub const F1: Square = Square(61);
pub const G1: Square = Square(62);
pub const H1: Square = Square(63);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(u8);

impl Rank {
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rank {
    type Error = RankParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value >= 8 {
            return Err(RankParseError::OutOfRange(value));
        }

        Ok(Rank(value))
    }
}

impl TryFrom<char> for Rank {
    type Error = RankParseError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '1'..='8' => Ok(Rank(value as u8 - b'1')),
            c => Err(RankParseError::InvalidChar(c)),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", (b'1' + self.0) as char)
    }
}

pub const RANK_1: Rank = Rank(0);
pub const RANK_2: Rank = Rank(1);
pub const RANK_3: Rank = Rank(2);
pub const RANK_4: Rank = Rank(3);
pub const RANK_5: Rank = Rank(4);
pub const RANK_6: Rank = Rank(5);
pub const RANK_7: Rank = Rank(6);
pub const RANK_8: Rank = Rank(7);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct File(u8);

impl File {
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for File {
    type Error = FileParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value >= 8 {
            return Err(FileParseError::OutOfRange(value));
        }

        Ok(File(value))
    }
}

impl TryFrom<char> for File {
    type Error = FileParseError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'a'..='h' => Ok(File(value as u8 - b'a')),
            c => Err(FileParseError::InvalidChar(c)),
        }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", (b'a' + self.0) as char)
    }
}

pub const FILE_A: File = File(0);
pub const FILE_B: File = File(1);
pub const FILE_C: File = File(2);
pub const FILE_D: File = File(3);
pub const FILE_E: File = File(4);
pub const FILE_F: File = File(5);
pub const FILE_G: File = File(6);
pub const FILE_H: File = File(7);

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn toggle(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "w"),
            Color::Black => write!(f, "b"),
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Parses the uppercase letter used for a piece in movetext. Pawns have no letter.
    pub fn from_san_char(c: char) -> Option<PieceKind> {
        match c {
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }

    pub fn is_slider(self) -> bool {
        matches!(self, PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen)
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };

        write!(f, "{}", c)
    }
}

/// One of the twelve piece codes. An empty square is `None` wherever an `Option<Piece>` is stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Piece {
        Piece { color, kind }
    }

    /// Index of this piece code in per-piece tables: white pieces first, then black.
    pub const fn index(self) -> usize {
        self.color as usize * 6 + self.kind as usize
    }
}

impl TryFrom<char> for Piece {
    type Error = PieceParseError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        let kind = match value.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return Err(PieceParseError::InvalidChar(value)),
        };

        let color = if value.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Ok(Piece { color, kind })
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.kind.to_string();
        match self.color {
            Color::White => write!(f, "{}", c.to_ascii_uppercase()),
            Color::Black => write!(f, "{}", c),
        }
    }
}

/// Compass directions, with vectors in FEN square order (north decreases the index).
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const fn as_vector(self) -> i32 {
        match self {
            Direction::North => -8,
            Direction::NorthEast => -7,
            Direction::East => 1,
            Direction::SouthEast => 9,
            Direction::South => 8,
            Direction::SouthWest => 7,
            Direction::West => -1,
            Direction::NorthWest => -9,
        }
    }
}

bitflags! {
    pub struct CastleStatus: u8 {
        const NONE = 0;
        const WHITE_KINGSIDE = 0b0000_0001;
        const WHITE_QUEENSIDE =0b0000_0010;
        const WHITE = Self::WHITE_KINGSIDE.bits | Self::WHITE_QUEENSIDE.bits;
        const BLACK_KINGSIDE = 0b0000_0100;
        const BLACK_QUEENSIDE = 0b0000_1000;
        const BLACK = Self::BLACK_KINGSIDE.bits | Self::BLACK_QUEENSIDE.bits;
    }
}

impl CastleStatus {
    pub fn from_char(c: char) -> Option<CastleStatus> {
        match c {
            'K' => Some(CastleStatus::WHITE_KINGSIDE),
            'Q' => Some(CastleStatus::WHITE_QUEENSIDE),
            'k' => Some(CastleStatus::BLACK_KINGSIDE),
            'q' => Some(CastleStatus::BLACK_QUEENSIDE),
            _ => None,
        }
    }
}

impl fmt::Display for CastleStatus {
    /// Formats as the FEN castling field: a `KQkq` subset, or `-` if no rights remain.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }

        for (flag, c) in [
            (CastleStatus::WHITE_KINGSIDE, 'K'),
            (CastleStatus::WHITE_QUEENSIDE, 'Q'),
            (CastleStatus::BLACK_KINGSIDE, 'k'),
            (CastleStatus::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.contains(flag) {
                write!(f, "{}", c)?;
            }
        }

        Ok(())
    }
}

macro_rules! type_iterator {
    ($name:ident, $type:ident, $max:expr) => {
        pub struct $name(u8, u8);

        impl Iterator for $name {
            type Item = $type;

            fn next(&mut self) -> Option<Self::Item> {
                if self.0 >= self.1 {
                    None
                } else {
                    let next = self.0;
                    self.0 += 1;
                    Some($type(next))
                }
            }
        }

        impl ::std::iter::DoubleEndedIterator for $name {
            fn next_back(&mut self) -> Option<Self::Item> {
                if self.1 <= self.0 {
                    None
                } else {
                    self.1 -= 1;
                    Some($type(self.1))
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name(0, $max)
            }
        }
    };
}

type_iterator!(AllSquares, Square, 64);
type_iterator!(AllRanks, Rank, 8);
type_iterator!(AllFiles, File, 8);

/// All squares, in FEN order (a8 first).
pub fn squares() -> AllSquares {
    AllSquares::default()
}

pub fn ranks() -> AllRanks {
    AllRanks::default()
}

pub fn files() -> AllFiles {
    AllFiles::default()
}

pub fn colors() -> ::std::array::IntoIter<Color, 2> {
    [Color::White, Color::Black].into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fen_order_numbering() {
        assert_eq!(0, A8.as_u8());
        assert_eq!(7, H8.as_u8());
        assert_eq!(56, A1.as_u8());
        assert_eq!(63, H1.as_u8());
        assert_eq!(E4, Square::of(RANK_4, FILE_E));
        assert_eq!(RANK_4, E4.rank());
        assert_eq!(FILE_E, E4.file());
    }

    #[test]
    fn square_names() {
        assert_eq!(Ok(E3), "e3".parse::<Square>());
        assert_eq!("h1", H1.to_string());
        assert!("i1".parse::<Square>().is_err());
        assert!("e9".parse::<Square>().is_err());
        assert!("e".parse::<Square>().is_err());
    }

    #[test]
    fn directions() {
        assert_eq!(E5, E4.towards(Direction::North));
        assert_eq!(F5, E4.towards(Direction::NorthEast));
        assert_eq!(D3, E4.towards(Direction::SouthWest));
    }

    #[test]
    fn piece_chars() {
        let piece = Piece::try_from('N').unwrap();
        assert_eq!(Piece::new(Color::White, PieceKind::Knight), piece);
        assert_eq!("n", Piece::new(Color::Black, PieceKind::Knight).to_string());
        assert_eq!(Err(PieceParseError::InvalidChar('x')), Piece::try_from('x'));
    }

    #[test]
    fn castle_status_display() {
        assert_eq!("KQkq", (CastleStatus::WHITE | CastleStatus::BLACK).to_string());
        assert_eq!("Qk", (CastleStatus::WHITE_QUEENSIDE | CastleStatus::BLACK_KINGSIDE).to_string());
        assert_eq!("-", CastleStatus::NONE.to_string());
    }
}
