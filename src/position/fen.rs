// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! FEN parsing, validation and generation.
//!
//! Parsing is strict about structure and about the consistency of the position: a FEN that decodes but describes
//! a board no game could be in the middle of (two white kings, a pawn on the back rank, the side not to move in
//! check, castling rights without the rook) is rejected. Reachability from the starting array is not checked.

use std::fmt::Write;

use thiserror::Error;

use crate::{
    core::{self, *},
    position::{
        king_start, kingside_castle_mask, kingside_rook, queenside_castle_mask, queenside_rook,
        Position,
    },
};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Possible errors that can arise when parsing a FEN string into a `Position`. Checks run in the order the
/// variants are declared and the first failure is reported.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum FenError {
    #[error("expected 6 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid side to move")]
    InvalidSideToMove,
    #[error("invalid castle")]
    InvalidCastle,
    #[error("invalid en-passant")]
    InvalidEnPassant,
    #[error("invalid halfmove")]
    InvalidHalfmove,
    #[error("invalid fullmove")]
    InvalidFullmove,
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),
    #[error("unknown piece: {0}")]
    UnknownPiece(char),
    #[error("invalid digit")]
    InvalidDigit,
    #[error("file does not sum to 8")]
    FileDoesNotSumToEight,
    #[error("pawn on the first or eighth rank")]
    PawnOnBackRank,
    #[error("more than 16 pieces for {0:?}")]
    TooManyPieces(Color),
    #[error("{0:?} does not have exactly one king")]
    KingCount(Color),
    #[error("more than 8 pawns for {0:?}")]
    TooManyPawns(Color),
    #[error("more promoted pieces than missing pawns for {0:?}")]
    TooManyPromotedPieces(Color),
    #[error("castling rights without king and rook on their home squares")]
    CastlingInconsistent,
    #[error("en-passant square without a pawn that just made a double push")]
    EnPassantInconsistent,
    #[error("side not to move is in check")]
    OpponentInCheck,
    #[error("side to move is attacked by more than two pieces")]
    TooManyCheckers,
}

impl Position {
    /// Constructs a new position from a FEN representation of a board position.
    pub fn from_fen(fen: impl AsRef<str>) -> Result<Position, FenError> {
        let fields: Vec<&str> = fen.as_ref().split_whitespace().collect();
        let [placement, side, castling, en_passant, halfmove, fullmove] = fields[..] else {
            return Err(FenError::FieldCount(fields.len()));
        };

        let side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::InvalidSideToMove),
        };
        let castle_status = parse_castle_status(castling)?;
        let en_passant_square = parse_en_passant(en_passant, side_to_move)?;
        let halfmove_clock = parse_counter(halfmove).ok_or(FenError::InvalidHalfmove)?;
        let fullmove_number = parse_counter(fullmove)
            .filter(|&n| n > 0)
            .ok_or(FenError::InvalidFullmove)?;

        let mut pos = Position::new();
        place_pieces(&mut pos, placement)?;
        pos.side_to_move = side_to_move;
        pos.castle_status = castle_status;
        pos.en_passant_square = en_passant_square;
        pos.halfmove_clock = halfmove_clock;
        pos.fullmove_number = fullmove_number;

        validate_material(&pos)?;
        validate_castling(&pos)?;
        validate_en_passant(&pos)?;
        if pos.is_check(side_to_move.toggle()) {
            return Err(FenError::OpponentInCheck);
        }
        if pos.checkers(side_to_move) > 2 {
            return Err(FenError::TooManyCheckers);
        }

        Ok(pos)
    }

    /// The FEN of this position, using its own clocks.
    pub fn as_fen(&self) -> String {
        self.fen_with_clocks(self.halfmove_clock, self.fullmove_number)
    }

    /// The FEN of this position with caller-supplied halfmove and fullmove counters. Only placement, side to
    /// move, castling and en-passant come from the position itself.
    pub fn fen_with_clocks(&self, halfmove: u32, fullmove: u32) -> String {
        let mut buf = String::new();
        for rank in core::ranks().rev() {
            let mut empty_squares = 0;
            for file in core::files() {
                let square = Square::of(rank, file);
                if let Some(piece) = self.piece_at(square) {
                    if empty_squares != 0 {
                        write!(&mut buf, "{}", empty_squares).unwrap();
                    }
                    write!(&mut buf, "{}", piece).unwrap();
                    empty_squares = 0;
                } else {
                    empty_squares += 1;
                }
            }

            if empty_squares != 0 {
                write!(&mut buf, "{}", empty_squares).unwrap();
            }

            if rank != core::RANK_1 {
                buf.push('/');
            }
        }

        let en_passant = match self.en_passant_square {
            Some(sq) => sq.to_string(),
            None => "-".to_string(),
        };
        write!(
            &mut buf,
            " {} {} {} {} {}",
            self.side_to_move, self.castle_status, en_passant, halfmove, fullmove
        )
        .unwrap();
        buf
    }
}

fn parse_castle_status(field: &str) -> Result<CastleStatus, FenError> {
    if field == "-" {
        return Ok(CastleStatus::NONE);
    }

    let mut status = CastleStatus::NONE;
    for c in field.chars() {
        match CastleStatus::from_char(c) {
            Some(flag) if !status.contains(flag) => status |= flag,
            _ => return Err(FenError::InvalidCastle),
        }
    }

    if status.is_empty() {
        return Err(FenError::InvalidCastle);
    }
    Ok(status)
}

/// The en-passant target must be on the sixth rank with White to move, or the third with Black to move.
fn parse_en_passant(field: &str, side_to_move: Color) -> Result<Option<Square>, FenError> {
    if field == "-" {
        return Ok(None);
    }

    let square: Square = field.parse().map_err(|_| FenError::InvalidEnPassant)?;
    let expected_rank = match side_to_move {
        Color::White => RANK_6,
        Color::Black => RANK_3,
    };
    if square.rank() != expected_rank {
        return Err(FenError::InvalidEnPassant);
    }
    Ok(Some(square))
}

fn parse_counter(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn place_pieces(pos: &mut Position, placement: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    // FEN lists rank 8 first, which is also square index order.
    for (rank_index, rank) in ranks.iter().enumerate() {
        let mut file = 0u8;
        for c in rank.chars() {
            if let Some(value) = c.to_digit(10) {
                if !(1..=8).contains(&value) {
                    return Err(FenError::InvalidDigit);
                }
                file += value as u8;
                if file > 8 {
                    return Err(FenError::FileDoesNotSumToEight);
                }
                continue;
            }

            let piece = Piece::try_from(c).map_err(|_| FenError::UnknownPiece(c))?;
            if file >= 8 {
                return Err(FenError::FileDoesNotSumToEight);
            }
            let square = Square::try_from(rank_index as u8 * 8 + file)
                .expect("rank and file are in range");
            pos.add_piece(square, piece);
            file += 1;
        }

        if file != 8 {
            return Err(FenError::FileDoesNotSumToEight);
        }
    }

    Ok(())
}

fn validate_material(pos: &Position) -> Result<(), FenError> {
    let back_ranks = SS_RANK_1 | SS_RANK_8;
    if !((pos.pawns(Color::White) | pos.pawns(Color::Black)) & back_ranks).is_empty() {
        return Err(FenError::PawnOnBackRank);
    }

    for color in core::colors() {
        if pos.pieces(color).len() > 16 {
            return Err(FenError::TooManyPieces(color));
        }
    }

    for color in core::colors() {
        if pos.pieces_of_kind(color, PieceKind::King).len() != 1 {
            return Err(FenError::KingCount(color));
        }
    }

    for color in core::colors() {
        let count = |kind| pos.pieces_of_kind(color, kind).len();
        let pawns = count(PieceKind::Pawn);
        if pawns > 8 {
            return Err(FenError::TooManyPawns(color));
        }

        // Every piece beyond the initial complement must have come from a promoted pawn.
        let promoted = count(PieceKind::Queen).saturating_sub(1)
            + count(PieceKind::Rook).saturating_sub(2)
            + count(PieceKind::Bishop).saturating_sub(2)
            + count(PieceKind::Knight).saturating_sub(2);
        if promoted > 8 - pawns {
            return Err(FenError::TooManyPromotedPieces(color));
        }
    }

    Ok(())
}

fn validate_castling(pos: &Position) -> Result<(), FenError> {
    for color in core::colors() {
        let king_home = pos.piece_at(king_start(color)) == Some(Piece::new(color, PieceKind::King));
        let rook = Some(Piece::new(color, PieceKind::Rook));
        let sides = [
            (kingside_castle_mask(color), kingside_rook(color)),
            (queenside_castle_mask(color), queenside_rook(color)),
        ];
        for (flag, rook_home) in sides {
            if pos.castle_status.contains(flag) && (!king_home || pos.piece_at(rook_home) != rook) {
                return Err(FenError::CastlingInconsistent);
            }
        }
    }

    Ok(())
}

/// The squares the pawn passed over and started from must be empty, and the pawn must stand just beyond the
/// target. Whether a pawn of the side to move is placed to take en passant is deliberately not checked.
fn validate_en_passant(pos: &Position) -> Result<(), FenError> {
    let target = match pos.en_passant_square {
        Some(target) => target,
        None => return Ok(()),
    };

    let them = pos.side_to_move.toggle();
    let (origin, pawn_square) = match them {
        Color::White => (target.towards(Direction::South), target.towards(Direction::North)),
        Color::Black => (target.towards(Direction::North), target.towards(Direction::South)),
    };

    if pos.piece_at(target).is_some()
        || pos.piece_at(origin).is_some()
        || pos.piece_at(pawn_square) != Some(Piece::new(them, PieceKind::Pawn))
    {
        return Err(FenError::EnPassantInconsistent);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        core::*,
        position::{FenError, Position, START_FEN},
    };

    #[test]
    fn starting_position() {
        let pos = Position::from_fen(START_FEN).unwrap();
        assert_eq!(Position::from_start_position(), pos);
        assert_eq!(Color::White, pos.side_to_move());
        assert_eq!(Some(Piece::new(Color::White, PieceKind::Queen)), pos.piece_at(D1));
        assert_eq!(Some(Piece::new(Color::Black, PieceKind::Knight)), pos.piece_at(G8));
        assert!(pos.can_castle_kingside(Color::White));
        assert!(pos.can_castle_queenside(Color::Black));
        assert!(pos.en_passant_square().is_none());
        assert!(pos.is_consistent());
    }

    #[test]
    fn start_position_roundtrip() {
        let pos = Position::from_fen(START_FEN).unwrap();
        assert_eq!(START_FEN, pos.as_fen());
    }

    #[test]
    fn roundtrip_laws() {
        let fens = [
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            "8/8/3k1p2/8/3pP3/8/3K4/8 b - e3 0 60",
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 12",
            "1k6/8/8/8/8/8/8/QQQ1K3 b - - 5 40",
        ];
        for fen in fens {
            let pos = Position::from_fen(fen).unwrap();
            let again = Position::from_fen(pos.as_fen()).unwrap();
            assert_eq!(pos, again, "{}", fen);
            assert_eq!(fen, pos.as_fen());
        }
    }

    #[test]
    fn caller_supplied_clocks() {
        let pos = Position::from_fen(START_FEN).unwrap();
        assert_eq!(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 7 33",
            pos.fen_with_clocks(7, 33)
        );
    }

    fn err(fen: &str) -> FenError {
        Position::from_fen(fen).unwrap_err()
    }

    #[test]
    fn field_count() {
        assert_eq!(FenError::FieldCount(0), err(""));
        assert_eq!(FenError::FieldCount(5), err("8/8/8/8/8/8/8/8 w - - 0"));
    }

    #[test]
    fn bad_side_to_move() {
        assert_eq!(FenError::InvalidSideToMove, err("4k3/8/8/8/8/8/8/4K3 c - - 0 1"));
    }

    #[test]
    fn bad_castle_status() {
        assert_eq!(FenError::InvalidCastle, err("4k3/8/8/8/8/8/8/4K3 w a - 0 1"));
        assert_eq!(FenError::InvalidCastle, err("4k3/8/8/8/8/8/8/4K3 w KK - 0 1"));
    }

    #[test]
    fn bad_en_passant() {
        assert_eq!(FenError::InvalidEnPassant, err("4k3/8/8/8/8/8/8/4K3 w - 88 0 1"));
        // Rank 3 targets only make sense with Black to move.
        assert_eq!(FenError::InvalidEnPassant, err("4k3/8/8/8/4P3/8/8/4K3 w - e3 0 1"));
    }

    #[test]
    fn bad_counters() {
        assert_eq!(FenError::InvalidHalfmove, err("4k3/8/8/8/8/8/8/4K3 w - - q 1"));
        assert_eq!(FenError::InvalidHalfmove, err("4k3/8/8/8/8/8/8/4K3 w - - -1 1"));
        assert_eq!(FenError::InvalidFullmove, err("4k3/8/8/8/8/8/8/4K3 w - - 0 4294967296"));
        assert_eq!(FenError::InvalidFullmove, err("4k3/8/8/8/8/8/8/4K3 w - - 0 0"));
    }

    #[test]
    fn bad_placement() {
        assert_eq!(FenError::RankCount(7), err("4k3/8/8/8/8/8/4K3 w - - 0 1"));
        assert_eq!(FenError::UnknownPiece('z'), err("z3k3/8/8/8/8/8/8/4K3 w - - 0 1"));
        assert_eq!(FenError::InvalidDigit, err("9/4k3/8/8/8/8/8/4K3 w - - 0 1"));
        assert_eq!(FenError::FileDoesNotSumToEight, err("pppp5/4k3/8/8/8/8/8/4K3 w - - 0 1"));
        assert_eq!(FenError::FileDoesNotSumToEight, err("4k2/8/8/8/8/8/8/4K3 w - - 0 1"));
    }

    #[test]
    fn bad_material() {
        assert_eq!(FenError::PawnOnBackRank, err("4k2P/8/8/8/8/8/8/4K3 w - - 0 1"));
        assert_eq!(
            FenError::TooManyPieces(Color::White),
            err("4k3/8/8/8/8/1N6/PPPPPPPP/RNBQKBNR w - - 0 1")
        );
        assert_eq!(FenError::KingCount(Color::Black), err("8/8/8/8/8/8/8/4K3 w - - 0 1"));
        assert_eq!(FenError::KingCount(Color::White), err("4k3/8/8/8/8/8/8/3KK3 w - - 0 1"));
        assert_eq!(
            FenError::TooManyPawns(Color::Black),
            err("4k3/pppppppp/p7/8/8/8/8/4K3 w - - 0 1")
        );
        assert_eq!(
            FenError::TooManyPromotedPieces(Color::White),
            err("4k3/8/8/8/8/8/PPPPPPPP/QQ2K3 w - - 0 1")
        );
    }

    #[test]
    fn promoted_pieces_paid_for_by_pawns() {
        assert!(Position::from_fen("4k3/8/8/8/8/8/1PPPPPPP/QQ2K3 w - - 0 1").is_ok());
    }

    #[test]
    fn castling_must_match_board() {
        assert_eq!(
            FenError::CastlingInconsistent,
            err("r3k2r/8/8/8/8/8/8/R3K1R1 w KQkq - 0 1")
        );
        assert_eq!(
            FenError::CastlingInconsistent,
            err("r4k1r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
        );
    }

    #[test]
    fn en_passant_must_match_board() {
        // No white pawn beyond e3.
        assert_eq!(
            FenError::EnPassantInconsistent,
            err("4k3/8/8/8/8/8/4P3/4K3 b - e3 0 1")
        );
        // The square the pawn came from is occupied.
        assert_eq!(
            FenError::EnPassantInconsistent,
            err("4k3/8/8/8/4P3/8/4N3/4K3 b - e3 0 1")
        );
    }

    #[test]
    fn en_passant_without_capturer_is_accepted() {
        // Known non-strict corner: nothing can take on e3, but the target is still accepted.
        let pos = Position::from_fen("4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1").unwrap();
        assert_eq!(Some(E3), pos.en_passant_square());
    }

    #[test]
    fn check_constraints() {
        // White to move while the black king stands in check from the rook.
        assert_eq!(FenError::OpponentInCheck, err("4k2R/8/8/8/8/8/8/4K3 w - - 0 1"));

        // Rook, bishop and knight all bear on e1.
        assert_eq!(FenError::TooManyCheckers, err("4r2k/8/8/b7/8/5n2/8/4K3 w - - 0 1"));

        // Double check is possible.
        assert!(Position::from_fen("4r2k/8/8/b7/8/8/8/4K3 w - - 0 1").is_ok());
    }
}
