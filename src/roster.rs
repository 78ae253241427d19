// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Mandatory tag policies.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const SEVEN_TAG_ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// Which tags a collected game must carry to be considered complete.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagRoster {
    /// The seven tags every archived game carries.
    #[default]
    SevenTag,
    /// Opening repertoires need only an `Opening` tag.
    Repertoire,
    /// Engine analysis records have no mandatory tags.
    Analysis,
}

impl TagRoster {
    pub fn mandatory_tags(self) -> &'static [&'static str] {
        match self {
            TagRoster::SevenTag => &SEVEN_TAG_ROSTER,
            TagRoster::Repertoire => &["Opening"],
            TagRoster::Analysis => &[],
        }
    }

    /// Whether `tags`, given in order of appearance, has no repeated name, no empty value, and every mandatory tag.
    pub fn is_satisfied_by<'a, I>(self, tags: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut seen = HashSet::new();
        for (name, value) in tags {
            if value.is_empty() || !seen.insert(name) {
                return false;
            }
        }

        self.mandatory_tags().iter().all(|tag| seen.contains(tag))
    }
}
