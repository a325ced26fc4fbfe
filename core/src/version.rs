//! Catalog of website versions this client knows about.
//!
//! Lookup is an exact string match over a compiled-in table. There is no
//! ordering or fuzzy matching: `2.0.0-pr7` and `2.0.0-pr8` are simply
//! different entries. New releases are appended to the end of the table.

use std::fmt;
use std::str::FromStr;

use crate::error::UnknownVersionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FluxVersion {
    V2_0_0Pr7,
    V2_0_0Pr8,
    V2_0_0Pr9,
    V2_0_0Pr10,
    V2_0_0Pr11,
    V2_0_0Pr12,
    V2_0_0Pr13,
}

struct Entry {
    name: &'static str,
    friendly_name: &'static str,
    major: u32,
    minor: u32,
    is_beta: bool,
}

const fn pre_release(name: &'static str, friendly_name: &'static str) -> Entry {
    Entry {
        name,
        friendly_name,
        major: 2,
        minor: 0,
        is_beta: true,
    }
}

impl FluxVersion {
    pub const ALL: [FluxVersion; 7] = [
        FluxVersion::V2_0_0Pr7,
        FluxVersion::V2_0_0Pr8,
        FluxVersion::V2_0_0Pr9,
        FluxVersion::V2_0_0Pr10,
        FluxVersion::V2_0_0Pr11,
        FluxVersion::V2_0_0Pr12,
        FluxVersion::V2_0_0Pr13,
    ];

    const fn entry(self) -> Entry {
        match self {
            FluxVersion::V2_0_0Pr7 => pre_release("2.0.0-pr7", "2.0.0 pre-release 7"),
            FluxVersion::V2_0_0Pr8 => pre_release("2.0.0-pr8", "2.0.0 pre-release 8"),
            FluxVersion::V2_0_0Pr9 => pre_release("2.0.0-pr9", "2.0.0 pre-release 9"),
            FluxVersion::V2_0_0Pr10 => pre_release("2.0.0-pr10", "2.0.0 pre-release 10"),
            FluxVersion::V2_0_0Pr11 => pre_release("2.0.0-pr11", "2.0.0 pre-release 11"),
            FluxVersion::V2_0_0Pr12 => pre_release("2.0.0-pr12", "2.0.0 pre-release 12"),
            FluxVersion::V2_0_0Pr13 => pre_release("2.0.0-pr13", "2.0.0 pre-release 13"),
        }
    }

    /// The version string as sent by the website.
    pub const fn name(self) -> &'static str {
        self.entry().name
    }

    pub const fn friendly_name(self) -> &'static str {
        self.entry().friendly_name
    }

    pub const fn major(self) -> u32 {
        self.entry().major
    }

    pub const fn minor(self) -> u32 {
        self.entry().minor
    }

    /// True for release candidates, pre-releases, betas and alphas.
    pub const fn is_beta(self) -> bool {
        self.entry().is_beta
    }

    pub fn parse(name: &str) -> Result<Self, UnknownVersionError> {
        Self::ALL
            .into_iter()
            .find(|version| version.name() == name)
            .ok_or_else(|| UnknownVersionError {
                version: name.to_string(),
            })
    }
}

impl FromStr for FluxVersion {
    type Err = UnknownVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FluxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly_name())
    }
}
