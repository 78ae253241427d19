// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use crate::core::{self, *};

mod fen;

pub use fen::{FenError, START_FEN};

/// A position, the board state reached after some sequence of moves in a game.
///
/// The `board` array is the only source of truth for piece placement. The per-piece sets, per-color sets and the
/// occupancy set are caches derived from it and are kept in step by [`Position::add_piece`] and
/// [`Position::remove_piece`]; nothing else writes to them.
///
/// Positions are plain values. Variations snapshot them by cloning, so a stored snapshot never observes later
/// mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// One entry per square in FEN order, `None` for an empty square.
    board: [Option<Piece>; 64],
    /// SquareSets for each piece and color combination (6 pieces, 2 colors = 12 sets).
    sets_by_piece: [SquareSet; 12],
    /// SquareSets for each color.
    sets_by_color: [SquareSet; 2],
    /// Every occupied square.
    occupancy: SquareSet,
    /// The en-passant target square, if the previous move was a double pawn push.
    en_passant_square: Option<Square>,
    /// The halfmove clock, or the progress to a draw by the 50-move Rule.
    halfmove_clock: u32,
    /// The fullmove number, incremented after each Black move.
    fullmove_number: u32,
    /// Castle status for both players.
    castle_status: CastleStatus,
    /// Color whose turn it is to move.
    side_to_move: Color,
}

impl Position {
    pub fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castle_status(&self) -> CastleStatus {
        self.castle_status
    }

    pub fn can_castle_kingside(&self, color: Color) -> bool {
        self.castle_status.contains(kingside_castle_mask(color))
    }

    pub fn can_castle_queenside(&self, color: Color) -> bool {
        self.castle_status.contains(queenside_castle_mask(color))
    }

    /// The occupancy bitmap: one bit per occupied square.
    pub fn occupancy(&self) -> SquareSet {
        self.occupancy
    }

    pub fn pieces(&self, color: Color) -> SquareSet {
        self.sets_by_color[color as usize]
    }

    pub fn pieces_of(&self, piece: Piece) -> SquareSet {
        self.sets_by_piece[piece.index()]
    }

    pub fn pieces_of_kind(&self, color: Color, kind: PieceKind) -> SquareSet {
        self.pieces_of(Piece::new(color, kind))
    }

    pub fn pawns(&self, color: Color) -> SquareSet {
        self.pieces_of_kind(color, PieceKind::Pawn)
    }

    pub fn king(&self, color: Color) -> Option<Square> {
        self.pieces_of_kind(color, PieceKind::King).into_iter().next()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.index()]
    }
}

impl Position {
    /// An empty board, White to move, no castling rights.
    pub fn new() -> Position {
        Position {
            board: [None; 64],
            sets_by_piece: [SquareSet::empty(); 12],
            sets_by_color: [SquareSet::empty(); 2],
            occupancy: SquareSet::empty(),
            halfmove_clock: 0,
            fullmove_number: 1,
            castle_status: CastleStatus::NONE,
            en_passant_square: None,
            side_to_move: Color::White,
        }
    }

    pub fn from_start_position() -> Position {
        let mut pos = Position::new();
        let back_rank = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        for (file, kind) in core::files().zip(back_rank) {
            pos.add_piece(Square::of(RANK_8, file), Piece::new(Color::Black, kind));
            pos.add_piece(Square::of(RANK_7, file), Piece::new(Color::Black, PieceKind::Pawn));
            pos.add_piece(Square::of(RANK_2, file), Piece::new(Color::White, PieceKind::Pawn));
            pos.add_piece(Square::of(RANK_1, file), Piece::new(Color::White, kind));
        }

        pos.castle_status = CastleStatus::WHITE | CastleStatus::BLACK;
        pos
    }

    /// Places a piece on an empty square, updating every cache.
    pub fn add_piece(&mut self, square: Square, piece: Piece) {
        debug_assert!(
            self.board[square.index()].is_none(),
            "add_piece on occupied square {}",
            square
        );
        self.board[square.index()] = Some(piece);
        self.sets_by_piece[piece.index()].insert(square);
        self.sets_by_color[piece.color as usize].insert(square);
        self.occupancy.insert(square);
    }

    /// Removes and returns the piece on a square, updating every cache.
    pub fn remove_piece(&mut self, square: Square) -> Option<Piece> {
        let piece = self.board[square.index()].take()?;
        self.sets_by_piece[piece.index()].remove(square);
        self.sets_by_color[piece.color as usize].remove(square);
        self.occupancy.remove(square);
        Some(piece)
    }

    /// Whether the cached sets agree with the board array.
    pub fn is_consistent(&self) -> bool {
        let mut by_piece = [SquareSet::empty(); 12];
        let mut by_color = [SquareSet::empty(); 2];
        let mut occupancy = SquareSet::empty();
        for sq in core::squares() {
            if let Some(piece) = self.piece_at(sq) {
                by_piece[piece.index()].insert(sq);
                by_color[piece.color as usize].insert(sq);
                occupancy.insert(sq);
            }
        }

        by_piece == self.sets_by_piece
            && by_color == self.sets_by_color
            && occupancy == self.occupancy
            && (self.pieces(Color::White) & self.pieces(Color::Black)).is_empty()
    }

    /// Whether the piece on `from` reaches `to` under the current occupancy, treating `to` as a capture target.
    pub fn attacks_square(&self, from: Square, to: Square) -> bool {
        match self.piece_at(from) {
            Some(piece) => {
                core::captures(piece, from).contains(to)
                    && (core::gaps(from, to) & self.occupancy).is_empty()
            }
            None => false,
        }
    }

    /// Squares holding pieces of color `by` that attack `target`.
    pub fn squares_attacking(&self, by: Color, target: Square) -> SquareSet {
        self.pieces(by)
            .into_iter()
            .filter(|&sq| self.attacks_square(sq, target))
            .collect()
    }

    pub fn is_check(&self, us: Color) -> bool {
        match self.king(us) {
            Some(king) => !self.squares_attacking(us.toggle(), king).is_empty(),
            None => false,
        }
    }

    /// Number of enemy pieces giving check to `us`.
    pub fn checkers(&self, us: Color) -> u32 {
        match self.king(us) {
            Some(king) => self.squares_attacking(us.toggle(), king).len(),
            None => 0,
        }
    }
}

//
// Make-move primitives.
//
// These trust their caller: the move engine in `san.rs` has already established which piece moves where. They
// never check that the mover's king is safe, which is the caller's job as well.
//

impl Position {
    /// Moves the piece on `from` to `to`, capturing whatever stands there (or the en-passant victim), promoting if
    /// asked, and updates clocks, en-passant target, castling rights and side to move.
    pub(crate) fn make_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) {
        let us = self.side_to_move;
        let moving_piece = self
            .remove_piece(from)
            .expect("invalid move: no piece at source square");

        let mut captured = self.remove_piece(to);
        if moving_piece.kind == PieceKind::Pawn
            && captured.is_none()
            && Some(to) == self.en_passant_square
            && from.file() != to.file()
        {
            // En-passant moves are the only case when the piece being captured does not lie on the destination
            // square. The victim is one rank behind the destination, from the mover's point of view.
            let behind = match us {
                Color::White => Direction::South,
                Color::Black => Direction::North,
            };
            captured = self.remove_piece(to.towards(behind));
        }

        let piece_to_add = match promotion {
            Some(kind) => Piece::new(us, kind),
            None => moving_piece,
        };
        self.add_piece(to, piece_to_add);

        let is_double_push = moving_piece.kind == PieceKind::Pawn
            && core::gaps(from, to).len() == 1
            && from.file() == to.file();
        self.en_passant_square = if is_double_push {
            core::gaps(from, to).single_square()
        } else {
            None
        };

        if captured.is_some() || moving_piece.kind == PieceKind::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.revoke_stale_castling();
        self.finish_move();
    }

    /// Relocates king and rook for a castle on `side`. Preconditions are checked by the caller.
    pub(crate) fn make_castle(&mut self, side: CastleSide) {
        let us = self.side_to_move;
        let (king_from, king_to, rook_from, rook_to) = castle_squares(us, side);
        let king = self
            .remove_piece(king_from)
            .expect("invalid castle: no king");
        let rook = self
            .remove_piece(rook_from)
            .expect("invalid castle: no rook");
        self.add_piece(king_to, king);
        self.add_piece(rook_to, rook);

        self.castle_status &= !castle_mask(us);
        self.en_passant_square = None;
        self.halfmove_clock += 1;
        self.finish_move();
    }

    /// Drops any castling right whose king or rook no longer stands on its home square. Covers the moving side
    /// (king or rook moved) and the opponent (rook captured at home) in one pass.
    fn revoke_stale_castling(&mut self) {
        for color in core::colors() {
            let king_home = self.piece_at(king_start(color)) == Some(Piece::new(color, PieceKind::King));
            let rook = Some(Piece::new(color, PieceKind::Rook));
            if !king_home || self.piece_at(kingside_rook(color)) != rook {
                self.castle_status &= !kingside_castle_mask(color);
            }
            if !king_home || self.piece_at(queenside_rook(color)) != rook {
                self.castle_status &= !queenside_castle_mask(color);
            }
        }
    }

    fn finish_move(&mut self) {
        if self.side_to_move == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = self.side_to_move.toggle();
    }
}

/// Which side of the board a castle goes to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rank in core::ranks().rev() {
            for file in core::files() {
                let sq = Square::of(rank, file);
                if let Some(piece) = self.piece_at(sq) {
                    write!(f, " {} ", piece)?;
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

impl Default for Position {
    fn default() -> Self {
        Position::from_start_position()
    }
}

pub(crate) fn king_start(color: Color) -> Square {
    match color {
        Color::White => E1,
        Color::Black => E8,
    }
}

pub(crate) fn kingside_rook(color: Color) -> Square {
    match color {
        Color::White => H1,
        Color::Black => H8,
    }
}

pub(crate) fn queenside_rook(color: Color) -> Square {
    match color {
        Color::White => A1,
        Color::Black => A8,
    }
}

pub(crate) fn kingside_castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE_KINGSIDE,
        Color::Black => CastleStatus::BLACK_KINGSIDE,
    }
}

pub(crate) fn queenside_castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE_QUEENSIDE,
        Color::Black => CastleStatus::BLACK_QUEENSIDE,
    }
}

fn castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE,
        Color::Black => CastleStatus::BLACK,
    }
}

/// King origin, king destination, rook origin and rook destination for a castle.
pub(crate) fn castle_squares(color: Color, side: CastleSide) -> (Square, Square, Square, Square) {
    match (color, side) {
        (Color::White, CastleSide::KingSide) => (E1, G1, H1, F1),
        (Color::White, CastleSide::QueenSide) => (E1, C1, A1, D1),
        (Color::Black, CastleSide::KingSide) => (E8, G8, H8, F8),
        (Color::Black, CastleSide::QueenSide) => (E8, C8, A8, D8),
    }
}

#[cfg(test)]
mod tests {
    mod model {
        use crate::{core::*, position::Position};

        #[test]
        fn start_position_caches() {
            let pos = Position::from_start_position();
            assert!(pos.is_consistent());
            assert_eq!(16, pos.pieces(Color::White).len());
            assert_eq!(16, pos.pieces(Color::Black).len());
            assert_eq!(SS_RANK_1 | SS_RANK_2 | SS_RANK_7 | SS_RANK_8, pos.occupancy());
            assert_eq!(Some(E1), pos.king(Color::White));
            assert_eq!(Some(E8), pos.king(Color::Black));
            assert_eq!("KQkq", pos.castle_status().to_string());
        }

        #[test]
        fn add_remove_keeps_caches() {
            let mut pos = Position::new();
            let knight = Piece::new(Color::Black, PieceKind::Knight);
            pos.add_piece(F6, knight);
            assert_eq!(Some(knight), pos.piece_at(F6));
            assert!(pos.pieces_of(knight).contains(F6));
            assert!(pos.is_consistent());

            assert_eq!(Some(knight), pos.remove_piece(F6));
            assert_eq!(None, pos.remove_piece(F6));
            assert!(pos.occupancy().is_empty());
            assert!(pos.is_consistent());
        }

        #[test]
        fn attacks_respect_gaps() {
            let pos = Position::from_start_position();
            // The queen on d1 is hemmed in by its own pawns.
            assert!(!pos.attacks_square(D1, H5));
            // Knights jump.
            assert!(pos.attacks_square(G1, F3));
            // Pawns attack diagonally only.
            assert!(pos.attacks_square(E2, D3));
            assert!(!pos.attacks_square(E2, E3));
            assert!(!pos.is_check(Color::White));
        }
    }

    mod make {
        use crate::{
            core::*,
            position::{CastleSide, Position},
        };

        #[test]
        fn double_pawn_push_sets_ep() {
            let mut pos = Position::from_start_position();
            pos.make_move(E2, E4, None);
            assert_eq!(Color::Black, pos.side_to_move());
            assert_eq!(Some(E3), pos.en_passant_square());
            assert_eq!(0, pos.halfmove_clock());
            assert_eq!(1, pos.fullmove_number());

            pos.make_move(G8, F6, None);
            assert_eq!(None, pos.en_passant_square());
            assert_eq!(1, pos.halfmove_clock());
            assert_eq!(2, pos.fullmove_number());
            assert!(pos.is_consistent());
        }

        #[test]
        fn en_passant_capture_removes_passed_pawn() {
            let mut pos = Position::new();
            pos.add_piece(E5, Piece::new(Color::White, PieceKind::Pawn));
            pos.add_piece(D7, Piece::new(Color::Black, PieceKind::Pawn));
            pos.side_to_move = Color::Black;
            pos.make_move(D7, D5, None);
            assert_eq!(Some(D6), pos.en_passant_square());

            pos.make_move(E5, D6, None);
            assert_eq!(None, pos.piece_at(D5));
            assert_eq!(
                Some(Piece::new(Color::White, PieceKind::Pawn)),
                pos.piece_at(D6)
            );
            assert_eq!(1, pos.occupancy().len());
            assert!(pos.is_consistent());
        }

        #[test]
        fn promotion_replaces_pawn() {
            let mut pos = Position::new();
            pos.add_piece(E7, Piece::new(Color::White, PieceKind::Pawn));
            pos.add_piece(F8, Piece::new(Color::Black, PieceKind::Bishop));
            pos.make_move(E7, F8, Some(PieceKind::Queen));
            assert_eq!(
                Some(Piece::new(Color::White, PieceKind::Queen)),
                pos.piece_at(F8)
            );
            assert!(pos.pawns(Color::White).is_empty());
            assert!(pos.pieces(Color::Black).is_empty());
        }

        #[test]
        fn rook_capture_revokes_castling() {
            let mut pos = Position::new();
            pos.add_piece(E1, Piece::new(Color::White, PieceKind::King));
            pos.add_piece(H1, Piece::new(Color::White, PieceKind::Rook));
            pos.add_piece(B7, Piece::new(Color::White, PieceKind::Bishop));
            pos.add_piece(E8, Piece::new(Color::Black, PieceKind::King));
            pos.add_piece(A8, Piece::new(Color::Black, PieceKind::Rook));
            pos.add_piece(H8, Piece::new(Color::Black, PieceKind::Rook));
            pos.castle_status = CastleStatus::WHITE_KINGSIDE | CastleStatus::BLACK;

            pos.make_move(B7, A8, None);
            assert!(!pos.can_castle_queenside(Color::Black));
            assert!(pos.can_castle_kingside(Color::Black));
            assert!(pos.can_castle_kingside(Color::White));
            assert_eq!(0, pos.halfmove_clock());
        }

        #[test]
        fn king_move_revokes_both() {
            let mut pos = Position::from_start_position();
            pos.remove_piece(E2);
            pos.make_move(E1, E2, None);
            assert!(!pos.can_castle_kingside(Color::White));
            assert!(!pos.can_castle_queenside(Color::White));
            assert!(pos.can_castle_kingside(Color::Black));
        }

        #[test]
        fn castle_moves_both_pieces() {
            let mut pos = Position::new();
            pos.add_piece(E1, Piece::new(Color::White, PieceKind::King));
            pos.add_piece(A1, Piece::new(Color::White, PieceKind::Rook));
            pos.castle_status = CastleStatus::WHITE_QUEENSIDE;
            pos.make_castle(CastleSide::QueenSide);
            assert_eq!(Some(Piece::new(Color::White, PieceKind::King)), pos.piece_at(C1));
            assert_eq!(Some(Piece::new(Color::White, PieceKind::Rook)), pos.piece_at(D1));
            assert!(pos.castle_status().is_empty());
            assert_eq!(1, pos.halfmove_clock());
            assert!(pos.is_consistent());
        }
    }
}
