// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The PGN parser.
//!
//! The parser is a state machine fed one lexeme at a time. It never fails: an illegal move, a stray variation
//! delimiter or a character no production accepts moves it into an error-recovery state, and the text consumed
//! there is wrapped into a single `{Error: ...}` token once the parser resynchronizes. Resynchronization happens at
//! the next termination marker or tag pair, or, for an error inside a variation, at the `)` closing that
//! variation.

mod game;

use std::{
    collections::VecDeque,
    io::{self, Read},
    mem,
};

use serde::{Deserialize, Serialize};

pub use game::{ErrorScope, Game, Outcome, TagPair};

use crate::{
    position::Position,
    ravstack::RavStack,
    roster::TagRoster,
    san::San,
    token::{self, Lexeme, Token},
};
use game::error_token;

/// Residual error recorded when a game ends without a termination marker.
pub const MISSING_TERMINATION: &str = "missing termination";
/// Residual error recorded when a game ends inside a variation.
pub const UNCLOSED_VARIATION: &str = "unclosed variation";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Bytes requested from the reader at a time by [`read_games`].
    pub chunk_size: usize,
    /// Record the position after every move in [`Game::positions`].
    pub keep_positions: bool,
    /// Tag roster assigned to collected games unless the collector supplies one.
    pub roster: TagRoster,
}

impl Default for ParserOptions {
    fn default() -> ParserOptions {
        ParserOptions {
            chunk_size: 65536,
            keep_positions: false,
            roster: TagRoster::SevenTag,
        }
    }
}

/// Hooks invoked as the parser collects a game. Every hook has a default that does nothing.
pub trait Collector {
    /// A token was appended to the current game's movetext.
    fn on_token_collected(&mut self, _token: &str) {}

    /// A move was played; `position` is the position after it.
    fn on_move_applied(&mut self, _token: &str, _position: &Position) {}

    fn on_game_collected(&mut self, _game: &Game) {}

    /// Overrides [`ParserOptions::roster`] for every game this collector sees.
    fn tag_roster_policy(&self) -> Option<TagRoster> {
        None
    }
}

/// A collector with no hooks.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl Collector for NoHooks {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// Between games, looking for a tag pair or the first move.
    Searching,
    SearchingAfterErrorInRav,
    SearchingAfterErrorInGame,
    CollectingTagPairs,
    CollectingMovetext,
    /// Text no production accepts was found before any game content.
    CollectingNonWhitespaceWhileSearching,
    /// A move like the `Qd1` of `Qd1f3` is waiting for its destination.
    DisambiguateMove,
}

/// The first half of a possible two-square move, with any whitespace seen after it.
#[derive(Debug)]
struct Pending {
    text: String,
    san: San,
    gap: String,
}

pub struct Parser<C = NoHooks> {
    options: ParserOptions,
    collector: C,
    state: State,
    game: Game,
    rav: Option<RavStack>,
    bad_fen: bool,
    error_text: String,
    /// Variations opened since entering an error inside a variation.
    error_depth: usize,
    pending: Option<Pending>,
    collected: VecDeque<Game>,
}

impl Parser<NoHooks> {
    pub fn new(options: ParserOptions) -> Parser<NoHooks> {
        Parser::with_collector(options, NoHooks)
    }
}

impl Default for Parser<NoHooks> {
    fn default() -> Parser<NoHooks> {
        Parser::new(ParserOptions::default())
    }
}

impl<C: Collector> Parser<C> {
    pub fn with_collector(options: ParserOptions, collector: C) -> Parser<C> {
        Parser {
            options,
            collector,
            state: State::Searching,
            game: Game::default(),
            rav: None,
            bad_fen: false,
            error_text: String::new(),
            error_depth: 0,
            pending: None,
            collected: VecDeque::new(),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    pub fn into_collector(self) -> C {
        self.collector
    }

    /// Parses `text`, which must end on a token boundary. Completed games are queued for [`Parser::next_game`].
    pub fn feed(&mut self, text: &str) {
        for lexeme in token::tokenize(text) {
            self.process(lexeme);
        }
    }

    /// Signals the end of input. A game in progress is collected with a residual error.
    pub fn finish(&mut self) {
        match self.state {
            State::Searching => {}
            State::DisambiguateMove => {
                if let Some(pending) = self.pending.take() {
                    self.error_text.push_str(&pending.text);
                }
                self.interrupt_game();
            }
            _ => self.interrupt_game(),
        }
    }

    pub fn next_game(&mut self) -> Option<Game> {
        self.collected.pop_front()
    }

    pub fn games(&mut self) -> impl Iterator<Item = Game> + '_ {
        self.collected.drain(..)
    }

    fn process(&mut self, lexeme: Lexeme<'_>) {
        tracing::trace!(state = ?self.state, text = lexeme.text, "token");
        match self.state {
            State::Searching => self.searching(lexeme),
            State::CollectingNonWhitespaceWhileSearching => self.collecting_junk(lexeme),
            State::CollectingTagPairs => self.collecting_tags(lexeme),
            State::CollectingMovetext => self.collecting_movetext(lexeme),
            State::SearchingAfterErrorInGame => self.after_error_in_game(lexeme),
            State::SearchingAfterErrorInRav => self.after_error_in_rav(lexeme),
            State::DisambiguateMove => self.disambiguate(lexeme),
        }
    }

    fn searching(&mut self, lexeme: Lexeme<'_>) {
        if lexeme.token.is_ignorable() {
            return;
        }

        self.begin_game();
        match lexeme.token {
            Token::TagPair { name, value } => {
                self.add_tag(name, value);
                self.state = State::CollectingTagPairs;
            }
            Token::Move(san) => {
                self.ensure_position();
                self.play_move(san, lexeme.text);
            }
            Token::Comment | Token::LineComment | Token::Nag => {
                self.ensure_position();
                self.push_token(lexeme.text.to_owned());
                self.state = State::CollectingMovetext;
            }
            Token::Termination(_) => {
                self.ensure_position();
                self.finish_game(lexeme.text);
            }
            _ => {
                self.error_text.push_str(lexeme.text);
                self.state = State::CollectingNonWhitespaceWhileSearching;
            }
        }
    }

    fn collecting_junk(&mut self, lexeme: Lexeme<'_>) {
        match lexeme.token {
            Token::TagPair { name, value } => {
                self.flush_error();
                self.add_tag(name, value);
                self.state = State::CollectingTagPairs;
            }
            Token::Move(san) => {
                self.flush_error();
                self.ensure_position();
                self.play_move(san, lexeme.text);
            }
            Token::Comment | Token::LineComment | Token::Nag => {
                self.flush_error();
                self.ensure_position();
                self.push_token(lexeme.text.to_owned());
                self.state = State::CollectingMovetext;
            }
            Token::Termination(_) => {
                self.ensure_position();
                self.finish_game(lexeme.text);
            }
            _ => self.error_text.push_str(lexeme.text),
        }
    }

    fn collecting_tags(&mut self, lexeme: Lexeme<'_>) {
        if lexeme.token.is_ignorable() {
            return;
        }

        self.ensure_position();
        match lexeme.token {
            Token::TagPair { name, value } => self.add_tag(name, value),
            Token::Move(san) => self.play_move(san, lexeme.text),
            Token::Comment | Token::LineComment | Token::Nag => {
                self.push_token(lexeme.text.to_owned());
                self.state = State::CollectingMovetext;
            }
            Token::Termination(_) => self.finish_game(lexeme.text),
            _ => self.enter_error(lexeme.text),
        }
    }

    fn collecting_movetext(&mut self, lexeme: Lexeme<'_>) {
        if lexeme.token.is_ignorable() {
            return;
        }

        match lexeme.token {
            Token::TagPair { name, value } => {
                self.interrupt_game();
                self.begin_game();
                self.add_tag(name, value);
                self.state = State::CollectingTagPairs;
            }
            Token::Move(san) => self.play_move(san, lexeme.text),
            Token::Comment | Token::LineComment | Token::Nag => {
                self.push_token(lexeme.text.to_owned())
            }
            Token::StartVariation => match self.rav.as_mut().map(RavStack::start_variation) {
                Some(Ok(())) => self.push_token(lexeme.text.to_owned()),
                _ => {
                    self.enter_error(lexeme.text);
                    // The unopened variation's own `)` must not close the enclosing one.
                    self.error_depth = 1;
                }
            },
            Token::EndVariation => match self.rav.as_mut().map(RavStack::end_variation) {
                Some(Ok(())) => self.push_token(lexeme.text.to_owned()),
                _ => self.enter_error(lexeme.text),
            },
            Token::Termination(_) => self.finish_game(lexeme.text),
            _ => self.enter_error(lexeme.text),
        }
    }

    fn after_error_in_game(&mut self, lexeme: Lexeme<'_>) {
        match lexeme.token {
            Token::TagPair { name, value } => {
                self.interrupt_game();
                self.begin_game();
                self.add_tag(name, value);
                self.state = State::CollectingTagPairs;
            }
            Token::Termination(_) => self.finish_game(lexeme.text),
            _ => self.error_text.push_str(lexeme.text),
        }
    }

    fn after_error_in_rav(&mut self, lexeme: Lexeme<'_>) {
        match lexeme.token {
            Token::TagPair { name, value } => {
                self.interrupt_game();
                self.begin_game();
                self.add_tag(name, value);
                self.state = State::CollectingTagPairs;
            }
            Token::Termination(_) => self.finish_game(lexeme.text),
            Token::StartVariation => {
                self.error_depth += 1;
                self.error_text.push_str(lexeme.text);
            }
            Token::EndVariation if self.error_depth > 0 => {
                self.error_depth -= 1;
                self.error_text.push_str(lexeme.text);
            }
            Token::EndVariation => {
                self.flush_error();
                match self.rav.as_mut().map(RavStack::end_variation) {
                    Some(Ok(())) => {
                        tracing::debug!("variation closed, leaving error scope");
                        self.push_token(lexeme.text.to_owned());
                        self.state = State::CollectingMovetext;
                    }
                    _ => self.enter_error(lexeme.text),
                }
            }
            _ => self.error_text.push_str(lexeme.text),
        }
    }

    fn disambiguate(&mut self, lexeme: Lexeme<'_>) {
        let mut pending = match self.pending.take() {
            Some(pending) => pending,
            None => {
                self.state = State::CollectingMovetext;
                return self.process(lexeme);
            }
        };

        match lexeme.token {
            Token::Whitespace => {
                pending.gap.push_str(lexeme.text);
                self.pending = Some(pending);
            }
            Token::Move(second) if second.is_plain_square() => {
                let combined = match (pending.san, second.destination()) {
                    (San::Normal { role, to: from, .. }, Some(to)) => San::Normal {
                        role,
                        file: Some(from.file()),
                        rank: Some(from.rank()),
                        capture: false,
                        to,
                        promotion: None,
                    },
                    _ => pending.san,
                };
                let text = format!("{}{}", pending.text, lexeme.text);
                self.apply(combined, text);
            }
            _ => {
                tracing::debug!(first = %pending.text, second = lexeme.text, "not a two-square move");
                self.enter_error(&pending.text);
                self.error_text.push_str(&pending.gap);
                self.process(lexeme);
            }
        }
    }

    fn roster(&self) -> TagRoster {
        self.collector
            .tag_roster_policy()
            .unwrap_or(self.options.roster)
    }

    fn begin_game(&mut self) {
        self.game = Game {
            roster: self.roster(),
            ..Game::default()
        };
        self.rav = None;
        self.bad_fen = false;
        self.error_text.clear();
        self.error_depth = 0;
        self.pending = None;
    }

    fn set_start(&mut self, start: Position) {
        self.game.positions = if self.options.keep_positions {
            Some(vec![(None, start.clone())])
        } else {
            None
        };
        self.rav = Some(RavStack::new(start));
    }

    /// Sets up the standard starting position unless a FEN tag already supplied one.
    fn ensure_position(&mut self) {
        if self.rav.is_none() && !self.bad_fen {
            self.set_start(Position::from_start_position());
        }
    }

    fn add_tag(&mut self, name: String, value: String) {
        if name == "FEN" {
            match Position::from_fen(&value) {
                Ok(start) => {
                    self.bad_fen = false;
                    self.set_start(start);
                }
                Err(err) => {
                    tracing::debug!(fen = %value, %err, "rejected FEN tag");
                    self.game.errors.push(format!("invalid FEN: {}", err));
                    self.bad_fen = true;
                    self.rav = None;
                }
            }
        }

        self.game.tag_map.insert(name.clone(), value.clone());
        self.game.tags.push(TagPair { name, value });
    }

    fn push_token(&mut self, token: String) {
        self.collector.on_token_collected(&token);
        self.game.tokens.push(token);
    }

    fn play_move(&mut self, san: San, text: &str) {
        self.state = State::CollectingMovetext;
        let prefix = match self.rav.as_ref() {
            Some(rav) => rav.current().is_disambiguation_prefix(&san),
            None => return self.enter_error(text),
        };

        if prefix {
            self.pending = Some(Pending {
                text: text.to_owned(),
                san,
                gap: String::new(),
            });
            self.state = State::DisambiguateMove;
        } else {
            self.apply(san, text.to_owned());
        }
    }

    fn apply(&mut self, san: San, text: String) {
        self.state = State::CollectingMovetext;
        let rav = match self.rav.as_mut() {
            Some(rav) => rav,
            None => return self.enter_error(&text),
        };

        match rav.play(&san) {
            Ok(position) => {
                self.collector.on_move_applied(&text, position);
                if let Some(positions) = self.game.positions.as_mut() {
                    positions.push((Some(text.clone()), position.clone()));
                }
                self.push_token(text);
            }
            Err(err) => {
                tracing::debug!(san = %text, %err, "illegal move");
                self.enter_error(&text);
            }
        }
    }

    fn enter_error(&mut self, text: &str) {
        self.error_text.push_str(text);
        self.error_depth = 0;
        self.state = if self.rav.as_ref().map_or(0, RavStack::depth) > 0 {
            State::SearchingAfterErrorInRav
        } else {
            State::SearchingAfterErrorInGame
        };
        tracing::debug!(state = ?self.state, text, "entering error recovery");
    }

    fn flush_error(&mut self) {
        let text = mem::take(&mut self.error_text);
        let text = text.trim();
        if !text.is_empty() {
            self.push_token(error_token(text));
        }
    }

    fn finish_game(&mut self, termination: &str) {
        self.flush_error();
        self.push_token(termination.to_owned());
        self.emit();
    }

    fn interrupt_game(&mut self) {
        self.flush_error();
        self.game.errors.push(MISSING_TERMINATION.to_owned());
        self.emit();
    }

    fn emit(&mut self) {
        if self.rav.as_ref().map_or(0, RavStack::depth) > 0 {
            self.game.errors.push(UNCLOSED_VARIATION.to_owned());
        }

        let game = mem::take(&mut self.game);
        tracing::info!(
            tags = game.tags.len(),
            tokens = game.tokens.len(),
            valid = game.is_movetext_valid(),
            "collected game"
        );
        self.collector.on_game_collected(&game);
        self.collected.push_back(game);

        self.rav = None;
        self.bad_fen = false;
        self.error_depth = 0;
        self.pending = None;
        self.state = State::Searching;
    }
}

/// Parses a complete text in one pass.
pub fn parse_str(text: &str, options: ParserOptions) -> Vec<Game> {
    let mut parser = Parser::new(options);
    parser.feed(text.strip_prefix('\u{feff}').unwrap_or(text));
    parser.finish();
    parser.games().collect()
}

/// Reads games from `reader` lazily, one chunk at a time.
pub fn read_games<R: Read>(reader: R, options: ParserOptions) -> Games<R> {
    Games::with_parser(reader, Parser::new(options))
}

/// Iterator returned by [`read_games`]. The only errors it yields come from the reader.
pub struct Games<R, C = NoHooks> {
    reader: R,
    parser: Parser<C>,
    buf: Vec<u8>,
    /// Bytes of a UTF-8 sequence cut by the last read.
    partial: Vec<u8>,
    /// Decoded text not yet handed to the parser.
    text: String,
    started: bool,
    done: bool,
}

impl<R: Read, C: Collector> Games<R, C> {
    pub fn with_parser(reader: R, parser: Parser<C>) -> Games<R, C> {
        let chunk_size = parser.options().chunk_size.max(1);
        Games {
            reader,
            parser,
            buf: vec![0; chunk_size],
            partial: Vec::new(),
            text: String::new(),
            started: false,
            done: false,
        }
    }

    pub fn parser(&self) -> &Parser<C> {
        &self.parser
    }

    fn fill(&mut self) -> io::Result<()> {
        let read = loop {
            match self.reader.read(&mut self.buf) {
                Ok(read) => break read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };

        if read == 0 {
            let rest = String::from_utf8_lossy(&self.partial).into_owned();
            self.partial.clear();
            self.text.push_str(&rest);
            self.skip_bom();

            let text = mem::take(&mut self.text);
            self.parser.feed(&text);
            self.parser.finish();
            self.done = true;
            return Ok(());
        }

        self.partial.extend_from_slice(&self.buf[..read]);
        let complete = self.partial.len() - incomplete_utf8_tail(&self.partial);
        let decoded = String::from_utf8_lossy(&self.partial[..complete]).into_owned();
        self.partial.drain(..complete);
        self.text.push_str(&decoded);
        self.skip_bom();

        let cut = token_boundary(&self.text);
        if cut > 0 {
            let rest = self.text.split_off(cut);
            let ready = mem::replace(&mut self.text, rest);
            tracing::trace!(bytes = ready.len(), carried = self.text.len(), "parsing chunk");
            self.parser.feed(&ready);
        }
        Ok(())
    }

    fn skip_bom(&mut self) {
        if !self.started && !self.text.is_empty() {
            if self.text.starts_with('\u{feff}') {
                self.text.replace_range(..'\u{feff}'.len_utf8(), "");
            }
            self.started = true;
        }
    }
}

impl<R: Read, C: Collector> Iterator for Games<R, C> {
    type Item = io::Result<Game>;

    fn next(&mut self) -> Option<io::Result<Game>> {
        loop {
            if let Some(game) = self.parser.next_game() {
                return Some(Ok(game));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fill() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

/// The longest prefix of `text` ending in whitespace, such that no lexeme in it could change by reading more.
///
/// A lone `[`, `{` or `<` holds back the text from it onwards for as long as it may still open a longer lexeme.
/// The cut never falls right after a space or tab: the carried text then starts with that character, so a `%`
/// following it is not mistaken for an escape at the start of a line.
fn token_boundary(text: &str) -> usize {
    let mut cut = 0;
    for lexeme in token::tokenize(text) {
        match lexeme.token {
            Token::Whitespace if lexeme.text.ends_with('\n') => cut = lexeme.end(),
            Token::Whitespace => {
                let last = lexeme.text.chars().next_back().map_or(0, char::len_utf8);
                cut = lexeme.end() - last;
            }
            Token::Other if token::may_continue(&text[lexeme.start..]) => break,
            _ => {}
        }
    }
    cut
}

/// Number of trailing bytes that begin a UTF-8 sequence the buffer does not yet complete.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }

        let width = match byte {
            0xF0..=0xFF => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}
