use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chamber {
    Upper,
    Lower,
}

impl Chamber {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::Upper => "upper",
            Chamber::Lower => "lower",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chamber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upper" | "senate" => Ok(Chamber::Upper),
            "lower" | "house" => Ok(Chamber::Lower),
            other => Err(format!("unknown chamber '{}' (expected upper or lower)", other)),
        }
    }
}

/// Party as published by the legislature. `Unknown` is stored as an empty
/// string and only occurs for members-elect whose party is not yet listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    Republican,
    Democratic,
    Green,
    Independent,
    Unknown,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Republican => "Republican",
            Party::Democratic => "Democratic",
            Party::Green => "Green",
            Party::Independent => "Independent",
            Party::Unknown => "",
        }
    }

    pub fn from_stored(s: &str) -> Option<Party> {
        match s {
            "Republican" => Some(Party::Republican),
            "Democratic" => Some(Party::Democratic),
            "Green" => Some(Party::Green),
            "Independent" => Some(Party::Independent),
            "" => Some(Party::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Party {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfficeRecord {
    pub kind: String,
    pub label: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl OfficeRecord {
    pub fn district(address: String, phone: Option<String>, email: Option<String>) -> Self {
        OfficeRecord {
            kind: "district".to_string(),
            label: "District Office".to_string(),
            address,
            phone,
            email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegislatorRecord {
    pub term: String,
    pub chamber: Chamber,
    pub district: String,
    pub full_name: String,
    pub party: Party,
    pub photo_url: String,
    pub source_url: String,
    pub sources: Vec<String>,
    pub offices: Vec<OfficeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
}

impl LegislatorRecord {
    /// Returns `None` when `district` is blank; such members are never recorded.
    pub fn new(
        term: &str,
        chamber: Chamber,
        district: &str,
        full_name: &str,
        party: Party,
        photo_url: &str,
        source_url: &str,
    ) -> Option<Self> {
        let district = district.trim();
        if district.is_empty() {
            return None;
        }
        Some(LegislatorRecord {
            term: term.to_string(),
            chamber,
            district: district.to_string(),
            full_name: full_name.to_string(),
            party,
            photo_url: photo_url.to_string(),
            source_url: source_url.to_string(),
            sources: Vec::new(),
            offices: Vec::new(),
            occupation: None,
        })
    }

    pub fn add_source(&mut self, url: &str) {
        if !self.sources.iter().any(|s| s == url) {
            self.sources.push(url.to_string());
        }
    }

    pub fn add_office(&mut self, office: OfficeRecord) {
        self.offices.push(office);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_district_rejected() {
        assert!(LegislatorRecord::new("2013-2014", Chamber::Lower, "  ", "A", Party::Green, "", "u").is_none());
    }

    #[test]
    fn sources_dedup() {
        let mut leg =
            LegislatorRecord::new("2013-2014", Chamber::Upper, "12", "A B", Party::Democratic, "", "u").unwrap();
        leg.add_source("u");
        leg.add_source("u");
        assert_eq!(leg.sources, vec!["u".to_string()]);
    }

    #[test]
    fn serializes_enums_as_strings() {
        let mut leg =
            LegislatorRecord::new("2013-2014", Chamber::Lower, "5", "Amy Lee", Party::Unknown, "", "u").unwrap();
        leg.add_office(OfficeRecord::district("1 Main St".into(), None, None));
        let v = serde_json::to_value(&leg).unwrap();
        assert_eq!(v["chamber"], "lower");
        assert_eq!(v["party"], "");
        assert_eq!(v["offices"][0]["label"], "District Office");
        assert!(v.get("occupation").is_none());
    }

    #[test]
    fn chamber_parsing() {
        assert_eq!("Upper".parse::<Chamber>(), Ok(Chamber::Upper));
        assert_eq!("house".parse::<Chamber>(), Ok(Chamber::Lower));
        assert!("joint".parse::<Chamber>().is_err());
    }
}
