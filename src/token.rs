// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lexical analysis of PGN text.
//!
//! A single composite pattern covers every production of the import format. The alternation ends in a catch-all
//! that matches any one character, so the lexemes produced for a text are contiguous and cover every byte of it.
//! Alternatives are tried in order, which is what keeps `Nbd7` from being read as `Nb` followed by junk and a
//! termination marker like `1-0` from being read as a move number.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Captures, CaptureMatches, Regex};

use crate::{
    core::{File, PieceKind, Rank, Square},
    parser::Outcome,
    position::CastleSide,
    san::San,
};

const MOVE_SUFFIX: &str = r"[+#]?(?:[!?]{1,2})?";

lazy_static! {
    static ref PGN_TOKEN: Regex = {
        let alternatives = [
            r#"(?P<tag>\[\s*(?P<tag_name>[A-Za-z0-9_+#=:-]+)\s*"(?P<tag_value>(?:[^"\\]|\\.)*)"\s*\])"#.to_owned(),
            format!(
                r"(?P<piece_capture>(?P<pc_role>[KQRBN])(?P<pc_file>[a-h])?(?P<pc_rank>[1-8])?x(?P<pc_to>[a-h][1-8]){})",
                MOVE_SUFFIX
            ),
            format!(
                r"(?P<piece_hint>(?P<ph_role>[QRBN])(?P<ph_from>[a-h1-8])(?P<ph_to>[a-h][1-8]){})",
                MOVE_SUFFIX
            ),
            format!(
                r"(?P<piece_move>(?P<pm_role>[KQRBN])(?P<pm_to>[a-h][1-8]){})",
                MOVE_SUFFIX
            ),
            format!(
                r"(?P<pawn_capture>(?P<pwc_file>[a-h])x(?P<pwc_to>[a-h](?:[18](?:=?[QRBN])?|[2-7])){})",
                MOVE_SUFFIX
            ),
            format!(
                r"(?P<pawn_move>(?P<pw_to>[a-h](?:[18](?:=?[QRBN])?|[2-7])){})",
                MOVE_SUFFIX
            ),
            format!(r"(?P<castle>O-O(?P<long>-O)?{})", MOVE_SUFFIX),
            r"(?P<termination>1-0|0-1|1/2-1/2|\*)".to_owned(),
            r"(?P<comment>\{[^}]*\})".to_owned(),
            r"(?P<line_comment>;[^\n]*)".to_owned(),
            r"(?P<nag>\$[0-9]+)".to_owned(),
            r"(?P<start_variation>\()".to_owned(),
            r"(?P<end_variation>\))".to_owned(),
            r"(?P<reserved><[^>]*>)".to_owned(),
            r"(?P<escape>(?m:^%[^\n]*))".to_owned(),
            r"(?P<move_number>[0-9]+\.*|\.+)".to_owned(),
            r"(?P<whitespace>\s+)".to_owned(),
            r"(?P<other>(?s:.))".to_owned(),
        ];

        Regex::new(&alternatives.join("|")).expect("PGN token pattern is valid")
    };

    /// Text a tag pair could still grow out of, anchored at both ends.
    static ref TAG_PREFIX: Regex =
        Regex::new(r#"\A\[\s*(?:[A-Za-z0-9_+#=:-]+\s*(?:"(?:[^"\\]|\\.)*(?:\\|"\s*)?)?)?\z"#)
            .expect("tag prefix pattern is valid");

    /// A blank line, or a line opening with a tag.
    static ref PARAGRAPH_BREAK: Regex =
        Regex::new(r"\n[ \t\r]*(?:\n|\[)").expect("paragraph break pattern is valid");
}

/// The kind of a lexeme, carrying whatever the parser needs to act on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `[Name "Value"]`, with `\"` and `\\` escapes in the value decoded.
    TagPair { name: String, value: String },
    Move(San),
    Termination(Outcome),
    Comment,
    LineComment,
    Nag,
    StartVariation,
    EndVariation,
    Reserved,
    Escape,
    MoveNumber,
    Whitespace,
    /// A single character no other production accepts.
    Other,
}

impl Token {
    /// Whether the lexeme carries nothing the movetext retains.
    pub fn is_ignorable(&self) -> bool {
        matches!(
            self,
            Token::Whitespace | Token::MoveNumber | Token::Escape | Token::Reserved
        )
    }
}

/// One match of the tokenizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub token: Token,
    pub text: &'a str,
    /// Byte offset of `text` within the tokenized input.
    pub start: usize,
}

impl Lexeme<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Iterator over the lexemes of a text. See [`tokenize`].
pub struct Tokens<'a> {
    matches: CaptureMatches<'static, 'a>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Lexeme<'a>;

    fn next(&mut self) -> Option<Lexeme<'a>> {
        let caps = self.matches.next()?;
        let whole = caps.get(0)?;
        Some(Lexeme {
            token: classify(&caps),
            text: whole.as_str(),
            start: whole.start(),
        })
    }
}

/// Splits `text` into lexemes covering all of it, in order.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens {
        matches: PGN_TOKEN.captures_iter(text),
    }
}

fn classify(caps: &Captures<'_>) -> Token {
    if caps.name("tag").is_some() {
        return Token::TagPair {
            name: group(caps, "tag_name").to_owned(),
            value: unescape_tag_value(group(caps, "tag_value")),
        };
    }

    if caps.name("piece_capture").is_some()
        || caps.name("piece_hint").is_some()
        || caps.name("piece_move").is_some()
        || caps.name("pawn_capture").is_some()
        || caps.name("pawn_move").is_some()
    {
        return san_from_captures(caps).map_or(Token::Other, Token::Move);
    }

    if caps.name("castle").is_some() {
        let side = if caps.name("long").is_some() {
            CastleSide::QueenSide
        } else {
            CastleSide::KingSide
        };
        return Token::Move(San::Castle(side));
    }

    if let Some(marker) = caps.name("termination") {
        return Outcome::from_marker(marker.as_str()).map_or(Token::Other, Token::Termination);
    }

    let simple = [
        ("comment", Token::Comment),
        ("line_comment", Token::LineComment),
        ("nag", Token::Nag),
        ("start_variation", Token::StartVariation),
        ("end_variation", Token::EndVariation),
        ("reserved", Token::Reserved),
        ("escape", Token::Escape),
        ("move_number", Token::MoveNumber),
        ("whitespace", Token::Whitespace),
    ];
    for (name, token) in simple {
        if caps.name(name).is_some() {
            return token;
        }
    }

    Token::Other
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}

fn role(text: &str) -> Option<PieceKind> {
    text.chars().next().and_then(PieceKind::from_san_char)
}

/// Reads a pawn destination like `e4`, `e8Q` or `e8=Q`.
fn pawn_destination(text: &str) -> Option<(Square, Option<PieceKind>)> {
    let to = Square::from_str(text.get(..2)?).ok()?;
    let promotion = match text.chars().last() {
        Some(c) if c.is_ascii_uppercase() => Some(PieceKind::from_san_char(c)?),
        _ => None,
    };
    Some((to, promotion))
}

fn san_from_captures(caps: &Captures<'_>) -> Option<San> {
    if caps.name("piece_capture").is_some() {
        return Some(San::Normal {
            role: role(group(caps, "pc_role"))?,
            file: caps
                .name("pc_file")
                .and_then(|m| m.as_str().chars().next())
                .and_then(|c| File::try_from(c).ok()),
            rank: caps
                .name("pc_rank")
                .and_then(|m| m.as_str().chars().next())
                .and_then(|c| Rank::try_from(c).ok()),
            capture: true,
            to: Square::from_str(group(caps, "pc_to")).ok()?,
            promotion: None,
        });
    }

    if caps.name("piece_hint").is_some() {
        let hint = group(caps, "ph_from").chars().next()?;
        return Some(San::Normal {
            role: role(group(caps, "ph_role"))?,
            file: File::try_from(hint).ok(),
            rank: Rank::try_from(hint).ok(),
            capture: false,
            to: Square::from_str(group(caps, "ph_to")).ok()?,
            promotion: None,
        });
    }

    if caps.name("piece_move").is_some() {
        return Some(San::Normal {
            role: role(group(caps, "pm_role"))?,
            file: None,
            rank: None,
            capture: false,
            to: Square::from_str(group(caps, "pm_to")).ok()?,
            promotion: None,
        });
    }

    if caps.name("pawn_capture").is_some() {
        let file = File::try_from(group(caps, "pwc_file").chars().next()?).ok()?;
        let (to, promotion) = pawn_destination(group(caps, "pwc_to"))?;
        return Some(San::Normal {
            role: PieceKind::Pawn,
            file: Some(file),
            rank: None,
            capture: true,
            to,
            promotion,
        });
    }

    let (to, promotion) = pawn_destination(group(caps, "pw_to"))?;
    Some(San::Normal {
        role: PieceKind::Pawn,
        file: None,
        rank: None,
        capture: false,
        to,
        promotion,
    })
}

/// Whether `text`, which starts at a lone `[`, `{` or `<` the tokenizer read as [`Token::Other`], could still become
/// a tag pair, comment or reserved sequence once more text is appended.
///
/// A tag pair stays possible only while `text` is a prefix of one. An unclosed comment or reserved sequence stays
/// possible until a blank line or a line opening with `[`, where the next game would begin.
pub fn may_continue(text: &str) -> bool {
    match text.chars().next() {
        Some('[') => TAG_PREFIX.is_match(text),
        Some('{' | '<') => !PARAGRAPH_BREAK.is_match(text),
        _ => false,
    }
}

/// Decodes the two escapes a tag value may contain.
pub fn unescape_tag_value(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped @ ('"' | '\\')) => value.push(escaped),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => value.push('\\'),
            }
        } else {
            value.push(c);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::{may_continue, tokenize, Token};
    use crate::{
        core::*,
        parser::Outcome,
        position::CastleSide,
        san::San,
    };

    fn tokens(text: &str) -> Vec<Token> {
        tokenize(text).map(|l| l.token).collect()
    }

    fn texts(text: &str) -> Vec<&str> {
        tokenize(text)
            .filter(|l| l.token != Token::Whitespace)
            .map(|l| l.text)
            .collect()
    }

    #[test]
    fn covers_every_byte() {
        let text = "[Event \"x\"]\n1. e4 {hi} e5?! 2. Nf3 $1 (2. f4) ; line\n%escape\n<r> @@ 1-0";
        let mut offset = 0;
        for lexeme in tokenize(text) {
            assert_eq!(offset, lexeme.start);
            offset = lexeme.end();
        }
        assert_eq!(text.len(), offset);
    }

    #[test]
    fn tag_pair() {
        assert_eq!(
            vec![Token::TagPair {
                name: "White".to_owned(),
                value: "Smith, \"J\" \\".to_owned(),
            }],
            tokens(r#"[White "Smith, \"J\" \\"]"#)
        );
    }

    #[test]
    fn move_shapes() {
        assert_eq!(
            vec![
                Token::Move(San::Normal {
                    role: PieceKind::Pawn,
                    file: None,
                    rank: None,
                    capture: false,
                    to: E4,
                    promotion: None,
                }),
                Token::Move(San::Normal {
                    role: PieceKind::Knight,
                    file: Some(FILE_B),
                    rank: None,
                    capture: false,
                    to: D7,
                    promotion: None,
                }),
                Token::Move(San::Normal {
                    role: PieceKind::Rook,
                    file: None,
                    rank: Some(RANK_1),
                    capture: true,
                    to: A3,
                    promotion: None,
                }),
                Token::Move(San::Normal {
                    role: PieceKind::Pawn,
                    file: Some(FILE_E),
                    rank: None,
                    capture: true,
                    to: D8,
                    promotion: Some(PieceKind::Queen),
                }),
                Token::Move(San::Castle(CastleSide::QueenSide)),
                Token::Move(San::Castle(CastleSide::KingSide)),
            ],
            tokenize("e4 Nbd7 R1xa3+ exd8=Q# O-O-O O-O!")
                .map(|l| l.token)
                .filter(|t| *t != Token::Whitespace)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn suffixes_stay_on_the_move() {
        assert_eq!(
            vec!["e4!!", "Nf6?", "Qxf7#", "O-O+"],
            texts("e4!! Nf6? Qxf7# O-O+")
        );
    }

    #[test]
    fn no_whitespace_needed() {
        assert_eq!(
            vec!["1.", "e4", "e5", "2.", "Nf3", "Nc6", "1-0"],
            texts("1.e4 e5 2.Nf3Nc6 1-0")
        );
    }

    #[test]
    fn two_square_queen_move_splits() {
        let lexemes: Vec<_> = tokenize("Qd1f3").collect();
        assert_eq!(2, lexemes.len());
        assert_eq!("Qd1", lexemes[0].text);
        assert_eq!("f3", lexemes[1].text);
        match &lexemes[1].token {
            Token::Move(san) => assert!(san.is_plain_square()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn promotion_only_on_last_rank() {
        assert_eq!(vec!["e4", "Nf6"], texts("e4Nf6"));
        assert_eq!(vec!["e8N", "f6"], texts("e8Nf6"));
    }

    #[test]
    fn terminations() {
        assert_eq!(
            vec![
                Token::Termination(Outcome::WhiteWins),
                Token::Termination(Outcome::BlackWins),
                Token::Termination(Outcome::Draw),
                Token::Termination(Outcome::Unknown),
            ],
            tokenize("1-0 0-1 1/2-1/2 *")
                .map(|l| l.token)
                .filter(|t| *t != Token::Whitespace)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn annotations_and_delimiters() {
        assert_eq!(
            vec![
                Token::Comment,
                Token::Nag,
                Token::StartVariation,
                Token::EndVariation,
                Token::Reserved,
                Token::LineComment,
            ],
            tokenize("{a (b) c} $12 ( ) <x> ;rest of line")
                .map(|l| l.token)
                .filter(|t| *t != Token::Whitespace)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn escape_only_at_line_start() {
        assert_eq!(
            vec![Token::Escape, Token::Whitespace, Token::Escape],
            tokens("%skip me\n%")
        );
        assert_eq!(Token::Other, tokens("e4 %")[2]);
    }

    #[test]
    fn unclosed_brace_is_other() {
        assert_eq!(vec![Token::Other, Token::Other], tokens("{a"));
    }

    #[test]
    fn openers_that_may_continue() {
        assert!(may_continue("["));
        assert!(may_continue("[Event"));
        assert!(may_continue("[Event \"Casual"));
        assert!(may_continue("[Event \"a \\"));
        assert!(may_continue("[Event \"Casual\" "));
        assert!(!may_continue("[bad\n1. e4"));
        assert!(!may_continue("[Event Casual"));

        assert!(may_continue("{a comment\nwrapped over lines"));
        assert!(!may_continue("{unclosed\n\n1. d4"));
        assert!(!may_continue("{unclosed\n[Event \"x\"]"));
        assert!(may_continue("<reserved"));
        assert!(!may_continue("e4"));
    }
}
