// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A PGN reader that checks the legality of every game it reads.
//!
//! Tokenizing and move validation happen in one pass. Each move is played on a bitboard [`Position`], so a
//! collected [`Game`] carries both the movetext tokens and whether they describe a legal game. Malformed input is
//! never fatal: offending text is preserved in `{Error: ...}` tokens and parsing carries on with the next game.
//!
//! ```
//! use pgn_legal::{parse_str, ParserOptions};
//!
//! let games = parse_str("1. e4 e5 2. Nf3 Qd4 *", ParserOptions::default());
//! assert_eq!(1, games.len());
//! assert!(!games[0].is_movetext_valid());
//! ```

pub mod core;
pub mod parser;
pub mod position;
pub mod ravstack;
pub mod roster;
pub mod san;
pub mod token;

pub use crate::parser::{
    parse_str, read_games, Collector, ErrorScope, Game, Games, Outcome, Parser, ParserOptions,
    TagPair,
};
pub use crate::position::{FenError, Position, START_FEN};
pub use crate::roster::TagRoster;
pub use crate::san::{MoveError, San};
