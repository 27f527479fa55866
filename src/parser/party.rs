use crate::legislator::{Chamber, Party};

/// Outcome of reading the trailing token of a member's name line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyClass {
    Known(Party),
    /// Incoming member whose party code has not been published yet; the
    /// trailing token is part of the name.
    ElectMissingParty,
    Unrecognized(String),
}

pub fn classify(title: &str, marker: &str) -> PartyClass {
    match marker {
        "(R)" => PartyClass::Known(Party::Republican),
        "(D)" => PartyClass::Known(Party::Democratic),
        "(G)" => PartyClass::Known(Party::Green),
        "(I)" => PartyClass::Known(Party::Independent),
        m if title.contains("-Elect") && !m.starts_with('(') => PartyClass::ElectMissingParty,
        m => PartyClass::Unrecognized(m.to_string()),
    }
}

/// Chamber implied by the title; `Representative-Elect` and `Senator-Elect` count.
pub fn chamber_from_title(title: &str) -> Option<Chamber> {
    if title.starts_with("Representative") {
        Some(Chamber::Lower)
    } else if title.starts_with("Senator") {
        Some(Chamber::Upper)
    } else {
        None
    }
}
