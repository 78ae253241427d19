// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Precomputed move tables. Everything here is a pure function of board geometry, built once on first use and
//! read-only afterwards, so every parser in the process shares the same tables.
//!
//! Slider tables ignore occupancy. Whether a slider's path is clear is answered separately by [`gaps`], which
//! gives the squares strictly between two squares on a shared line. Knight hops and king steps have an empty gap,
//! so "table bit set and gap unoccupied" is a uniform reachability test for every piece.

use std::sync::LazyLock;

use crate::core::*;

const SS_RANK_12: SquareSet = SS_RANK_1.or(SS_RANK_2);
const SS_RANK_78: SquareSet = SS_RANK_7.or(SS_RANK_8);

const SS_FILE_AB: SquareSet = SS_FILE_A.or(SS_FILE_B);
const SS_FILE_GH: SquareSet = SS_FILE_G.or(SS_FILE_H);

struct MoveTables {
    file: [SquareSet; 64],
    rank: [SquareSet; 64],
    diagonal: [SquareSet; 64],
    anti_diagonal: [SquareSet; 64],
    king: [SquareSet; 64],
    knight: [SquareSet; 64],
    /// Pawn pushes (single, and double from the starting rank), indexed by color.
    pawn_moves: [[SquareSet; 64]; 2],
    pawn_captures: [[SquareSet; 64]; 2],
    gaps: [[SquareSet; 64]; 64],
}

impl MoveTables {
    fn new() -> MoveTables {
        let mut tables = MoveTables {
            file: [SquareSet::empty(); 64],
            rank: [SquareSet::empty(); 64],
            diagonal: [SquareSet::empty(); 64],
            anti_diagonal: [SquareSet::empty(); 64],
            king: [SquareSet::empty(); 64],
            knight: [SquareSet::empty(); 64],
            pawn_moves: [[SquareSet::empty(); 64]; 2],
            pawn_captures: [[SquareSet::empty(); 64]; 2],
            gaps: [[SquareSet::empty(); 64]; 64],
        };

        for sq in squares() {
            let (file, rank) = coordinates(sq);
            let line = |keep: &dyn Fn(i32, i32) -> bool| -> SquareSet {
                squares()
                    .filter(|&other| {
                        let (f, r) = coordinates(other);
                        keep(f, r)
                    })
                    .collect()
            };

            let i = sq.index();
            tables.file[i] = line(&|f, _| f == file);
            tables.rank[i] = line(&|_, r| r == rank);
            tables.diagonal[i] = line(&|f, r| f - r == file - rank);
            tables.anti_diagonal[i] = line(&|f, r| f + r == file + rank);
            tables.king[i] = king_steps(sq);
            tables.knight[i] = knight_hops(sq);

            for color in colors() {
                tables.pawn_moves[color as usize][i] = pawn_pushes(sq, color);
                tables.pawn_captures[color as usize][i] = pawn_captures(sq, color);
            }
        }

        for from in squares() {
            for to in squares() {
                let (a, b) = (from.index(), to.index());
                let shared = if a == b {
                    SquareSet::empty()
                } else if tables.file[a].contains(to) {
                    tables.file[a]
                } else if tables.rank[a].contains(to) {
                    tables.rank[a]
                } else if tables.diagonal[a].contains(to) {
                    tables.diagonal[a]
                } else if tables.anti_diagonal[a].contains(to) {
                    tables.anti_diagonal[a]
                } else {
                    SquareSet::empty()
                };

                // Along any line the squares strictly between two members are exactly the members whose index
                // falls strictly between theirs.
                let (lo, hi) = (a.min(b), a.max(b));
                let between = if hi - lo > 1 {
                    SquareSet::from_bits((1u64 << hi) - (1u64 << (lo + 1)))
                } else {
                    SquareSet::empty()
                };
                tables.gaps[a][b] = shared & between;
            }
        }

        tables
    }
}

/// File and rank of a square as signed coordinates, file a = 0 and rank 1 = 0.
fn coordinates(sq: Square) -> (i32, i32) {
    (sq.file().as_u8() as i32, sq.rank().as_u8() as i32)
}

fn king_steps(sq: Square) -> SquareSet {
    let mut board = SquareSet::empty();
    if !SS_RANK_8.contains(sq) {
        board.insert(sq.towards(Direction::North));
        if !SS_FILE_A.contains(sq) {
            board.insert(sq.towards(Direction::NorthWest));
        }
        if !SS_FILE_H.contains(sq) {
            board.insert(sq.towards(Direction::NorthEast));
        }
    }

    if !SS_RANK_1.contains(sq) {
        board.insert(sq.towards(Direction::South));
        if !SS_FILE_A.contains(sq) {
            board.insert(sq.towards(Direction::SouthWest));
        }
        if !SS_FILE_H.contains(sq) {
            board.insert(sq.towards(Direction::SouthEast));
        }
    }

    if !SS_FILE_A.contains(sq) {
        board.insert(sq.towards(Direction::West));
    }
    if !SS_FILE_H.contains(sq) {
        board.insert(sq.towards(Direction::East));
    }
    board
}

fn knight_hops(sq: Square) -> SquareSet {
    // Offsets are in FEN order: moving up the board subtracts 8 per rank.
    let mut board = SquareSet::empty();
    if !SS_FILE_A.contains(sq) && !SS_RANK_78.contains(sq) {
        board.insert(sq.plus(-17));
    }
    if !SS_FILE_H.contains(sq) && !SS_RANK_78.contains(sq) {
        board.insert(sq.plus(-15));
    }
    if !SS_FILE_GH.contains(sq) && !SS_RANK_8.contains(sq) {
        board.insert(sq.plus(-6));
    }
    if !SS_FILE_GH.contains(sq) && !SS_RANK_1.contains(sq) {
        board.insert(sq.plus(10));
    }
    if !SS_FILE_H.contains(sq) && !SS_RANK_12.contains(sq) {
        board.insert(sq.plus(17));
    }
    if !SS_FILE_A.contains(sq) && !SS_RANK_12.contains(sq) {
        board.insert(sq.plus(15));
    }
    if !SS_FILE_AB.contains(sq) && !SS_RANK_1.contains(sq) {
        board.insert(sq.plus(6));
    }
    if !SS_FILE_AB.contains(sq) && !SS_RANK_8.contains(sq) {
        board.insert(sq.plus(-10));
    }
    board
}

fn pawn_pushes(sq: Square, color: Color) -> SquareSet {
    let (promo_rank, start_rank, up) = match color {
        Color::White => (SS_RANK_8, SS_RANK_2, Direction::North),
        Color::Black => (SS_RANK_1, SS_RANK_7, Direction::South),
    };

    let mut board = SquareSet::empty();
    if promo_rank.contains(sq) {
        return board;
    }

    let single = sq.towards(up);
    board.insert(single);
    if start_rank.contains(sq) {
        board.insert(single.towards(up));
    }
    board
}

fn pawn_captures(sq: Square, color: Color) -> SquareSet {
    let (promo_rank, up_left, up_right) = match color {
        Color::White => (SS_RANK_8, Direction::NorthWest, Direction::NorthEast),
        Color::Black => (SS_RANK_1, Direction::SouthWest, Direction::SouthEast),
    };

    let mut board = SquareSet::empty();
    if promo_rank.contains(sq) {
        return board;
    }

    if !SS_FILE_A.contains(sq) {
        board.insert(sq.towards(up_left));
    }
    if !SS_FILE_H.contains(sq) {
        board.insert(sq.towards(up_right));
    }
    board
}

static TABLES: LazyLock<MoveTables> = LazyLock::new(MoveTables::new);

pub fn file_mask(sq: Square) -> SquareSet {
    TABLES.file[sq.index()]
}

pub fn rank_mask(sq: Square) -> SquareSet {
    TABLES.rank[sq.index()]
}

pub fn diagonal_mask(sq: Square) -> SquareSet {
    TABLES.diagonal[sq.index()]
}

pub fn anti_diagonal_mask(sq: Square) -> SquareSet {
    TABLES.anti_diagonal[sq.index()]
}

pub fn king_moves(sq: Square) -> SquareSet {
    TABLES.king[sq.index()]
}

pub fn knight_moves(sq: Square) -> SquareSet {
    TABLES.knight[sq.index()]
}

/// Squares on the same rank or file, excluding `sq` itself.
pub fn rook_moves(sq: Square) -> SquareSet {
    (file_mask(sq) | rank_mask(sq)) & !SquareSet::single(sq)
}

/// Squares on the same diagonals, excluding `sq` itself.
pub fn bishop_moves(sq: Square) -> SquareSet {
    (diagonal_mask(sq) | anti_diagonal_mask(sq)) & !SquareSet::single(sq)
}

pub fn queen_moves(sq: Square) -> SquareSet {
    rook_moves(sq) | bishop_moves(sq)
}

pub fn pawn_moves(sq: Square, color: Color) -> SquareSet {
    TABLES.pawn_moves[color as usize][sq.index()]
}

pub fn pawn_captures_from(sq: Square, color: Color) -> SquareSet {
    TABLES.pawn_captures[color as usize][sq.index()]
}

/// Squares strictly between `from` and `to` when they share a rank, file or diagonal. Empty otherwise, which
/// includes adjacent squares and knight hops.
pub fn gaps(from: Square, to: Square) -> SquareSet {
    TABLES.gaps[from.index()][to.index()]
}

/// Squares a piece could move to from `sq` on an empty board, ignoring captures.
pub fn moves(piece: Piece, sq: Square) -> SquareSet {
    match piece.kind {
        PieceKind::Pawn => pawn_moves(sq, piece.color),
        PieceKind::Knight => knight_moves(sq),
        PieceKind::Bishop => bishop_moves(sq),
        PieceKind::Rook => rook_moves(sq),
        PieceKind::Queen => queen_moves(sq),
        PieceKind::King => king_moves(sq),
    }
}

/// Squares a piece could capture on from `sq` on an empty board. Only pawns capture differently than they move.
pub fn captures(piece: Piece, sq: Square) -> SquareSet {
    match piece.kind {
        PieceKind::Pawn => pawn_captures_from(sq, piece.color),
        _ => moves(piece, sq),
    }
}

#[cfg(test)]
mod tests {
    use crate::core::*;

    const WHITE_PAWN: Piece = Piece::new(Color::White, PieceKind::Pawn);
    const BLACK_PAWN: Piece = Piece::new(Color::Black, PieceKind::Pawn);

    #[test]
    fn king_corner() {
        let expected: SquareSet = [B1, A2, B2].into_iter().collect();
        assert_eq!(expected, king_moves(A1));
        assert_eq!(8, king_moves(E4).len());
    }

    #[test]
    fn knight_hops() {
        let expected: SquareSet = [G3, F2].into_iter().collect();
        assert_eq!(expected, knight_moves(H1));
        let expected: SquareSet = [C3, D2, F2, G3, G5, F6, D6, C5].into_iter().collect();
        assert_eq!(expected, knight_moves(E4));
    }

    #[test]
    fn pawn_pushes() {
        let expected: SquareSet = [E3, E4].into_iter().collect();
        assert_eq!(expected, moves(WHITE_PAWN, E2));
        assert_eq!(SquareSet::single(E4), moves(WHITE_PAWN, E3));
        let expected: SquareSet = [D6, D5].into_iter().collect();
        assert_eq!(expected, moves(BLACK_PAWN, D7));
        assert!(moves(WHITE_PAWN, E8).is_empty());
    }

    #[test]
    fn pawn_captures() {
        let expected: SquareSet = [D5, F5].into_iter().collect();
        assert_eq!(expected, captures(WHITE_PAWN, E4));
        let expected: SquareSet = [D3, F3].into_iter().collect();
        assert_eq!(expected, captures(BLACK_PAWN, E4));
        assert_eq!(SquareSet::single(B3), captures(WHITE_PAWN, A2));
    }

    #[test]
    fn slider_tables() {
        assert_eq!(14, rook_moves(D4).len());
        assert_eq!(13, bishop_moves(D4).len());
        assert_eq!(7, bishop_moves(A1).len());
        assert!(queen_moves(D1).contains(H5));
        assert!(!queen_moves(D1).contains(E3));
    }

    #[test]
    fn gaps_on_lines() {
        let expected: SquareSet = [B1, C1, D1].into_iter().collect();
        assert_eq!(expected, gaps(A1, E1));
        assert_eq!(expected, gaps(E1, A1));

        let expected: SquareSet = [E2, F3, G4].into_iter().collect();
        assert_eq!(expected, gaps(D1, H5));

        let expected: SquareSet = [E3].into_iter().collect();
        assert_eq!(expected, gaps(E2, E4));

        let expected: SquareSet = [B7, C6, D5, E4, F3, G2].into_iter().collect();
        assert_eq!(expected, gaps(A8, H1));
    }

    #[test]
    fn gaps_empty_off_lines() {
        assert!(gaps(G1, F3).is_empty());
        assert!(gaps(E4, E5).is_empty());
        assert!(gaps(A1, B3).is_empty());
        assert!(gaps(A1, A1).is_empty());
        // h-file square and next rank's a-file square are adjacent indices but share no line.
        assert!(gaps(H5, A4).is_empty());
    }
}
