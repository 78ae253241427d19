// Copyright 2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::PathBuf,
};

use pgn_legal::{read_games, ErrorScope, ParserOptions, TagRoster};
use serde::Serialize;
use structopt::StructOpt;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

/// Reads PGN games and reports which are legal.
#[derive(Debug, StructOpt)]
struct Options {
    /// PGN file to read. Standard input is read if omitted.
    #[structopt(name = "PGN")]
    pgn: Option<PathBuf>,

    /// JSON file holding parser options.
    #[structopt(long)]
    config: Option<PathBuf>,

    /// Bytes to read at a time.
    #[structopt(long)]
    chunk_size: Option<usize>,

    /// Mandatory tag roster: seven-tag, repertoire or analysis.
    #[structopt(long, parse(try_from_str = parse_roster))]
    roster: Option<TagRoster>,

    /// Print one JSON report per game instead of a summary.
    #[structopt(long)]
    json: bool,
}

fn parse_roster(s: &str) -> anyhow::Result<TagRoster> {
    Ok(serde_json::from_value(serde_json::Value::String(s.to_owned()))?)
}

#[derive(Serialize)]
struct Report<'a> {
    index: usize,
    event: Option<&'a str>,
    movetext_valid: bool,
    tags_valid: bool,
    error_scope: ErrorScope,
    errors: Vec<String>,
    result: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(LevelFilter::WARN)
        .with_env_filter(EnvFilter::from_env("PGN_LOG"))
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args = Options::from_args();
    let mut options = match &args.config {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => ParserOptions::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        options.chunk_size = chunk_size;
    }
    if let Some(roster) = args.roster {
        options.roster = roster;
    }

    let input: Box<dyn Read> = match &args.pgn {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };

    let (mut total, mut legal, mut tagged) = (0, 0, 0);
    for (index, game) in read_games(input, options).enumerate() {
        let game = game?;
        total += 1;
        if game.is_movetext_valid() {
            legal += 1;
        }
        if game.has_valid_tags() {
            tagged += 1;
        }

        if args.json {
            let mut errors = game.error_texts();
            errors.extend(game.errors().iter().cloned());
            let report = Report {
                index,
                event: game.tag("Event"),
                movetext_valid: game.is_movetext_valid(),
                tags_valid: game.has_valid_tags(),
                error_scope: game.error_scope(),
                errors,
                result: game.outcome().map(|o| o.to_string()),
            };
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    if !args.json {
        println!("{:<20} {}", "Games:", total);
        println!("{:<20} {}", "Legal movetext:", legal);
        println!("{:<20} {}", "Complete tags:", tagged);
    }
    Ok(())
}
