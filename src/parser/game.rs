// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{position::Position, roster::TagRoster};

const ERROR_OPEN: &str = "{Error: ";
const ERROR_CLOSE: &str = "}";
/// Stands in for a literal `}` inside an error token.
const ESCAPED_BRACE: &str = "::{{::";

/// The result recorded by a game termination marker.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[display(fmt = "1-0")]
    WhiteWins,
    #[display(fmt = "0-1")]
    BlackWins,
    #[display(fmt = "1/2-1/2")]
    Draw,
    #[display(fmt = "*")]
    Unknown,
}

impl Outcome {
    pub fn from_marker(marker: &str) -> Option<Outcome> {
        match marker {
            "1-0" => Some(Outcome::WhiteWins),
            "0-1" => Some(Outcome::BlackWins),
            "1/2-1/2" => Some(Outcome::Draw),
            "*" => Some(Outcome::Unknown),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub name: String,
    pub value: String,
}

/// Where a game's errors were found.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorScope {
    None,
    /// Every error is confined to a variation; the main line is intact.
    InVariation,
    InMainLine,
}

/// A game as collected by the parser.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Game {
    pub(crate) tags: Vec<TagPair>,
    pub(crate) tag_map: HashMap<String, String>,
    pub(crate) tokens: Vec<String>,
    pub(crate) errors: Vec<String>,
    pub(crate) positions: Option<Vec<(Option<String>, Position)>>,
    pub(crate) roster: TagRoster,
}

impl Game {
    /// Tag pairs in the order they appeared, duplicates included.
    pub fn tags(&self) -> &[TagPair] {
        &self.tags
    }

    /// The last value seen for a tag.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tag_map.get(name).map(String::as_str)
    }

    pub fn tag_map(&self) -> &HashMap<String, String> {
        &self.tag_map
    }

    /// Movetext tokens: moves with their suffixes, comments, NAGs, variation delimiters, `{Error: ...}` tokens and
    /// the termination marker.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Problems that could not be placed in the token list, like a missing termination marker.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The starting position followed by the position after each move, when the parser was asked to keep them.
    pub fn positions(&self) -> Option<&[(Option<String>, Position)]> {
        self.positions.as_deref()
    }

    pub fn final_position(&self) -> Option<&Position> {
        self.positions.as_ref()?.last().map(|(_, pos)| pos)
    }

    pub fn roster(&self) -> TagRoster {
        self.roster
    }

    pub fn is_movetext_valid(&self) -> bool {
        self.errors.is_empty() && !self.tokens.iter().any(|t| is_error_token(t))
    }

    pub fn is_tag_roster_valid(&self, roster: TagRoster) -> bool {
        roster.is_satisfied_by(self.tags.iter().map(|t| (t.name.as_str(), t.value.as_str())))
    }

    /// Checks the tags against the roster the game was collected under.
    pub fn has_valid_tags(&self) -> bool {
        self.is_tag_roster_valid(self.roster)
    }

    pub fn error_scope(&self) -> ErrorScope {
        if !self.errors.is_empty() {
            return ErrorScope::InMainLine;
        }

        let mut depth = 0usize;
        let mut in_variation = false;
        for token in &self.tokens {
            match token.as_str() {
                "(" => depth += 1,
                ")" => depth = depth.saturating_sub(1),
                t if is_error_token(t) => {
                    if depth == 0 {
                        return ErrorScope::InMainLine;
                    }
                    in_variation = true;
                }
                _ => {}
            }
        }

        if in_variation {
            ErrorScope::InVariation
        } else {
            ErrorScope::None
        }
    }

    /// The verbatim text of every error token.
    pub fn error_texts(&self) -> Vec<String> {
        self.tokens
            .iter()
            .filter_map(|t| t.strip_prefix(ERROR_OPEN)?.strip_suffix(ERROR_CLOSE))
            .map(|t| t.replace(ESCAPED_BRACE, "}"))
            .collect()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.tokens.last().and_then(|t| Outcome::from_marker(t))
    }
}

pub(crate) fn error_token(text: &str) -> String {
    format!("{}{}{}", ERROR_OPEN, text.replace('}', ESCAPED_BRACE), ERROR_CLOSE)
}

fn is_error_token(token: &str) -> bool {
    token.starts_with(ERROR_OPEN)
}

#[cfg(test)]
mod tests {
    use super::{error_token, ErrorScope, Game, Outcome};

    fn game(tokens: &[&str]) -> Game {
        Game {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Game::default()
        }
    }

    #[test]
    fn error_token_escapes_brace() {
        let token = error_token("Qd8 {x}");
        assert_eq!("{Error: Qd8 {x::{{::}", token);
        assert_eq!(vec!["Qd8 {x}".to_owned()], game(&[&token]).error_texts());
    }

    #[test]
    fn scopes() {
        assert_eq!(ErrorScope::None, game(&["e4", "e5", "1-0"]).error_scope());
        assert_eq!(
            ErrorScope::InVariation,
            game(&["e4", "(", "d4", "{Error: Qd8}", ")", "e5"]).error_scope()
        );
        assert_eq!(
            ErrorScope::InMainLine,
            game(&["e4", "(", "d4", ")", "{Error: Qd8}"]).error_scope()
        );

        let mut truncated = game(&["e4"]);
        truncated.errors.push("missing termination".to_owned());
        assert_eq!(ErrorScope::InMainLine, truncated.error_scope());
        assert!(!truncated.is_movetext_valid());
    }

    #[test]
    fn outcome() {
        assert_eq!(Some(Outcome::Draw), game(&["e4", "1/2-1/2"]).outcome());
        assert_eq!(None, game(&["e4"]).outcome());
        assert_eq!("1/2-1/2", Outcome::Draw.to_string());
        assert_eq!("*", Outcome::Unknown.to_string());
    }
}
