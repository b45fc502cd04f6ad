//! Lamport operation identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::patch::PatchError;

/// Identifies one concurrent operation as `(counter, actor)`, encoded
/// externally as `"<counter>@<actorId>"`.
///
/// The `Ord` implementation is the Lamport order: counters compare first,
/// actor ids break ties as byte strings. Two distinct operations never share
/// an identifier given unique actor ids; if they do, they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpId {
    pub counter: u64,
    pub actor: String,
}

impl OpId {
    pub fn new(counter: u64, actor: impl Into<String>) -> Self {
        Self {
            counter,
            actor: actor.into(),
        }
    }
}

impl Ord for OpId {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.counter.cmp(&other.counter) {
            Ordering::Equal => self.actor.as_bytes().cmp(other.actor.as_bytes()),
            ord => ord,
        }
    }
}

impl PartialOrd for OpId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for OpId {
    type Err = PatchError;

    /// Parses `<digits>@<rest>`. The counter must be a plain decimal that
    /// fits in a `u64`; the actor part may contain further `@` signs.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (counter, actor) = text
            .split_once('@')
            .ok_or_else(|| PatchError::MalformedOpId(text.to_string()))?;
        if counter.is_empty() || !counter.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PatchError::MalformedOpId(text.to_string()));
        }
        let counter = counter
            .parse::<u64>()
            .map_err(|_| PatchError::MalformedOpId(text.to_string()))?;
        Ok(Self {
            counter,
            actor: actor.to_string(),
        })
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.counter, self.actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_counter_at_actor() {
        let id: OpId = "17@a1b2".parse().expect("valid op id");
        assert_eq!(id, OpId::new(17, "a1b2"));
        assert_eq!(id.to_string(), "17@a1b2");
    }

    #[test]
    fn parse_keeps_later_at_signs_in_the_actor() {
        let id: OpId = "3@actor@host".parse().expect("valid op id");
        assert_eq!(id, OpId::new(3, "actor@host"));
    }

    #[test]
    fn parse_allows_an_empty_actor() {
        let id: OpId = "9@".parse().expect("valid op id");
        assert_eq!(id, OpId::new(9, ""));
    }

    #[test]
    fn parse_rejects_missing_or_non_numeric_counter() {
        for text in ["", "@a", "x@a", "1x@a", "+1@a", "-1@a", "noatsign"] {
            assert!(text.parse::<OpId>().is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn counter_compares_numerically_not_lexicographically() {
        let nine: OpId = "9@B".parse().expect("valid op id");
        let ten: OpId = "10@A".parse().expect("valid op id");
        assert!(ten > nine);
    }

    #[test]
    fn actor_breaks_counter_ties() {
        let a: OpId = "5@A".parse().expect("valid op id");
        let b: OpId = "5@B".parse().expect("valid op id");
        assert!(a < b);
        assert_eq!(a.cmp(&a), Ordering::Equal);
    }
}
