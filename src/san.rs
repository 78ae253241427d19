// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Playing moves written in standard algebraic notation.
//!
//! A [`San`] carries only what the movetext said: the piece letter, any origin hint, whether it captures, the
//! destination and a promotion. Deriving the origin square requires full knowledge of the position, which is why
//! playing a move lives on [`Position`].

use std::fmt;

use thiserror::Error;

use crate::{
    core::{self, *},
    position::{castle_squares, kingside_castle_mask, queenside_castle_mask, CastleSide, Position},
};

/// A move as written in movetext, before its origin square is known.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum San {
    Normal {
        role: PieceKind,
        file: Option<File>,
        rank: Option<Rank>,
        capture: bool,
        to: Square,
        promotion: Option<PieceKind>,
    },
    Castle(CastleSide),
}

impl San {
    /// Whether this is a bare square like `f3`: a pawn move with no capture and no promotion. Such a token may be
    /// the second half of a move like `Qd1f3` that the tokenizer split in two.
    pub fn is_plain_square(&self) -> bool {
        matches!(
            self,
            San::Normal {
                role: PieceKind::Pawn,
                capture: false,
                promotion: None,
                ..
            }
        )
    }

    pub fn destination(&self) -> Option<Square> {
        match *self {
            San::Normal { to, .. } => Some(to),
            San::Castle(_) => None,
        }
    }
}

impl fmt::Display for San {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            San::Normal {
                role,
                file,
                rank,
                capture,
                to,
                promotion,
            } => {
                if role != PieceKind::Pawn {
                    write!(f, "{}", role.to_string().to_ascii_uppercase())?;
                }
                if let Some(file) = file {
                    write!(f, "{}", file)?;
                }
                if let Some(rank) = rank {
                    write!(f, "{}", rank)?;
                }
                if capture {
                    write!(f, "x")?;
                }
                write!(f, "{}", to)?;
                if let Some(promotion) = promotion {
                    write!(f, "={}", promotion.to_string().to_ascii_uppercase())?;
                }
                Ok(())
            }
            San::Castle(CastleSide::KingSide) => write!(f, "O-O"),
            San::Castle(CastleSide::QueenSide) => write!(f, "O-O-O"),
        }
    }
}

/// Reasons a syntactically valid move cannot be played in a position.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no {0:?} can move to {1}")]
    NoCandidate(PieceKind, Square),
    #[error("{count} pieces can move to {to}")]
    Ambiguous { to: Square, count: u32 },
    #[error("destination {0} is occupied")]
    DestinationOccupied(Square),
    #[error("nothing to capture on {0}")]
    NothingToCapture(Square),
    #[error("pawn reaching the last rank must promote")]
    MissingPromotion,
    #[error("promotion is only possible for a pawn reaching the last rank")]
    UnexpectedPromotion,
    #[error("cannot promote to {0:?}")]
    InvalidPromotion(PieceKind),
    #[error("move leaves the king in check")]
    LeavesKingInCheck,
    #[error("no castling right")]
    NoCastlingRight,
    #[error("king or rook not on its home square")]
    CastlingPiecesMissing,
    #[error("pieces between king and rook")]
    CastlingPathBlocked,
    #[error("cannot castle out of check")]
    CastlingOutOfCheck,
    #[error("cannot castle through or into check")]
    CastlingThroughCheck,
}

impl Position {
    /// Plays a move for the side to move. On error the position is left untouched.
    pub fn play(&mut self, san: &San) -> Result<(), MoveError> {
        let (role, file, rank, capture, to, promotion) = match *san {
            San::Castle(side) => return self.play_castle(side),
            San::Normal {
                role,
                file,
                rank,
                capture,
                to,
                promotion,
            } => (role, file, rank, capture, to, promotion),
        };

        let us = self.side_to_move();
        self.check_destination(role, capture, to)?;
        self.check_promotion(role, to, promotion)?;
        let from = self.find_origin(Piece::new(us, role), file, rank, capture, to)?;

        let mut next = self.clone();
        next.make_move(from, to, promotion);
        if next.is_check(us) {
            return Err(MoveError::LeavesKingInCheck);
        }

        *self = next;
        Ok(())
    }

    /// Whether `san` reads as the first half of a from-square/to-square pair, like the `Qd1` of `Qd1f3`.
    ///
    /// That is the case for an unhinted, non-capturing queen, rook, bishop or knight move whose destination holds
    /// one of the mover's own pieces of the same kind, when more than two such pieces are on the board. Only then
    /// is a two-square origin ever needed. Kings and pawns never qualify.
    pub fn is_disambiguation_prefix(&self, san: &San) -> bool {
        match *san {
            San::Normal {
                role,
                file: None,
                rank: None,
                capture: false,
                to,
                promotion: None,
            } if matches!(
                role,
                PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight
            ) =>
            {
                let piece = Piece::new(self.side_to_move(), role);
                self.piece_at(to) == Some(piece) && self.pieces_of(piece).len() > 2
            }
            _ => false,
        }
    }

    fn check_destination(&self, role: PieceKind, capture: bool, to: Square) -> Result<(), MoveError> {
        let them = self.side_to_move().toggle();
        match (capture, self.piece_at(to)) {
            (false, None) => Ok(()),
            (false, Some(_)) => Err(MoveError::DestinationOccupied(to)),
            (true, Some(victim)) if victim.color == them => Ok(()),
            (true, None) if role == PieceKind::Pawn && self.en_passant_square() == Some(to) => Ok(()),
            (true, _) => Err(MoveError::NothingToCapture(to)),
        }
    }

    fn check_promotion(
        &self,
        role: PieceKind,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<(), MoveError> {
        let last_rank = match self.side_to_move() {
            Color::White => RANK_8,
            Color::Black => RANK_1,
        };

        match (role, promotion) {
            (PieceKind::Pawn, None) if to.rank() == last_rank => Err(MoveError::MissingPromotion),
            (PieceKind::Pawn, Some(_)) if to.rank() != last_rank => Err(MoveError::UnexpectedPromotion),
            (PieceKind::Pawn, Some(kind @ (PieceKind::Pawn | PieceKind::King))) => {
                Err(MoveError::InvalidPromotion(kind))
            }
            (PieceKind::Pawn, _) => Ok(()),
            (_, Some(_)) => Err(MoveError::UnexpectedPromotion),
            (_, None) => Ok(()),
        }
    }

    /// Finds the single square the moving piece can come from.
    fn find_origin(
        &self,
        piece: Piece,
        file: Option<File>,
        rank: Option<Rank>,
        capture: bool,
        to: Square,
    ) -> Result<Square, MoveError> {
        let occupancy = self.occupancy();
        let mut candidates: SquareSet = self
            .pieces_of(piece)
            .into_iter()
            .filter(|&from| {
                let reach = if capture {
                    core::captures(piece, from)
                } else {
                    core::moves(piece, from)
                };
                reach.contains(to) && (core::gaps(from, to) & occupancy).is_empty()
            })
            .collect();

        // A hint that contradicts the only candidate still makes the move illegal.
        if let Some(file) = file {
            candidates = candidates.file(file);
        }
        if let Some(rank) = rank {
            candidates = candidates.rank(rank);
        }

        if candidates.len() > 1 {
            candidates = candidates
                .into_iter()
                .filter(|&from| !self.is_pinned_off_line(from, to))
                .collect();
        }

        match candidates.single_square() {
            Some(from) => Ok(from),
            None if candidates.is_empty() => Err(MoveError::NoCandidate(piece.kind, to)),
            None => Err(MoveError::Ambiguous {
                to,
                count: candidates.len(),
            }),
        }
    }

    /// Whether moving the piece on `from` to `to` would open a line from an enemy slider to our king. The final
    /// king-safety test after the move is still authoritative; this only prunes candidates.
    fn is_pinned_off_line(&self, from: Square, to: Square) -> bool {
        let us = self.side_to_move();
        let king = match self.king(us) {
            Some(king) => king,
            None => return false,
        };

        let occupancy_after = (self.occupancy() & !SquareSet::single(from)) | SquareSet::single(to);
        self.pieces(us.toggle()).into_iter().any(|attacker| {
            let slider = match self.piece_at(attacker) {
                Some(piece) if piece.kind.is_slider() => piece,
                _ => return false,
            };

            let line = core::gaps(attacker, king);
            attacker != to
                && core::moves(slider, attacker).contains(king)
                && line.contains(from)
                && (line & occupancy_after).is_empty()
        })
    }

    fn play_castle(&mut self, side: CastleSide) -> Result<(), MoveError> {
        let us = self.side_to_move();
        let them = us.toggle();
        let flag = match side {
            CastleSide::KingSide => kingside_castle_mask(us),
            CastleSide::QueenSide => queenside_castle_mask(us),
        };
        if !self.castle_status().contains(flag) {
            return Err(MoveError::NoCastlingRight);
        }

        let (king_from, king_to, rook_from, _) = castle_squares(us, side);
        if self.piece_at(king_from) != Some(Piece::new(us, PieceKind::King))
            || self.piece_at(rook_from) != Some(Piece::new(us, PieceKind::Rook))
        {
            return Err(MoveError::CastlingPiecesMissing);
        }

        if !(core::gaps(king_from, rook_from) & self.occupancy()).is_empty() {
            return Err(MoveError::CastlingPathBlocked);
        }

        if self.is_check(us) {
            return Err(MoveError::CastlingOutOfCheck);
        }

        let king_path = core::gaps(king_from, king_to) | SquareSet::single(king_to);
        if king_path
            .into_iter()
            .any(|sq| !self.squares_attacking(them, sq).is_empty())
        {
            return Err(MoveError::CastlingThroughCheck);
        }

        let mut next = self.clone();
        next.make_castle(side);
        if next.is_check(us) {
            return Err(MoveError::LeavesKingInCheck);
        }

        *self = next;
        Ok(())
    }
}
