//! Type definitions for message bus

use serde::{Deserialize, Serialize};

/// What to tell the broker about a delivered message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Processed; do not redeliver
    #[default]
    Ack,
    /// Unprocessable; do not redeliver
    Term,
    /// Transient failure; redeliver
    Nak,
}

impl Disposition {
    /// Label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Ack => "ack",
            Disposition::Term => "term",
            Disposition::Nak => "nak",
        }
    }

    fn severity(&self) -> u8 {
        match self {
            Disposition::Ack => 0,
            Disposition::Term => 1,
            Disposition::Nak => 2,
        }
    }

    /// Keep the more severe of two dispositions (nak > term > ack)
    pub fn merge(self, other: Disposition) -> Disposition {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl FromIterator<Disposition> for Disposition {
    fn from_iter<I: IntoIterator<Item = Disposition>>(iter: I) -> Self {
        iter.into_iter().fold(Disposition::Ack, Disposition::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_most_severe() {
        use Disposition::*;

        assert_eq!(Ack.merge(Ack), Ack);
        assert_eq!(Ack.merge(Term), Term);
        assert_eq!(Term.merge(Ack), Term);
        assert_eq!(Term.merge(Nak), Nak);
        assert_eq!(Nak.merge(Term), Nak);
        assert_eq!(Nak.merge(Ack), Nak);
    }

    #[test]
    fn test_collect() {
        let all: Disposition = vec![Disposition::Ack, Disposition::Term, Disposition::Ack]
            .into_iter()
            .collect();
        assert_eq!(all, Disposition::Term);

        let none: Disposition = Vec::new().into_iter().collect();
        assert_eq!(none, Disposition::Ack);
    }
}
