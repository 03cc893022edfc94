//! Registry token types with a strict charset.
//!
//! Tokens are 1..=64 ASCII chars from `[A-Za-z0-9_\-:.]`. Serde goes through
//! the same parser, so a snapshot can never carry an invalid identifier.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

fn is_token(s: &str) -> bool {
    let len = s.len();
    if !(1..=64).contains(&len) {
        return false;
    }
    s.bytes().all(|b| matches!(b,
        b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' |
        b'_' | b'-' | b':' | b'.'
    ))
}

macro_rules! def_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if is_token(s) { Ok(Self(s.to_string())) } else { Err(CoreError::InvalidToken) }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                if is_token(&s) { Ok(Self(s)) } else { Err(CoreError::InvalidToken) }
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String { id.0 }
        }
    }
}

def_token!(
    /// A vote, majority election, proportional election or election union.
    PoliticalBusinessId
);
def_token!(CountingCircleId);
def_token!(BallotId);
def_token!(ListId);
def_token!(
    /// A list union ("Listenverbindung") or sub-list union.
    ListUnionId
);
def_token!(
    /// Identity shared by the lists of one party across the elections of a union.
    UnionListId
);
def_token!(CandidateId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_charset_is_enforced() {
        assert!("L-1".parse::<ListId>().is_ok());
        assert!("pe:zh.2027".parse::<PoliticalBusinessId>().is_ok());
        assert_eq!("".parse::<ListId>(), Err(CoreError::InvalidToken));
        assert_eq!("a b".parse::<CandidateId>(), Err(CoreError::InvalidToken));
        assert!("x".repeat(65).parse::<CandidateId>().is_err());
    }

    #[test]
    fn serde_goes_through_the_parser() {
        let id: CandidateId = serde_json::from_str("\"C-7\"").unwrap();
        assert_eq!(id.as_str(), "C-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"C-7\"");
        assert!(serde_json::from_str::<CandidateId>("\"C 7\"").is_err());
    }
}
