use std::fmt;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::info_table::InfoTable;
use super::party::{chamber_from_title, classify, PartyClass};
use super::{elem_text, ParseError};
use crate::legislator::{Chamber, LegislatorRecord, OfficeRecord, Party};

static NAME_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.SiteNames").unwrap());
static PHOTO_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img.SitePhotos").unwrap());
static INFO_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table.InfoTable").unwrap());
static ADDRESS_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("nobr").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoDistrict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOutcome {
    Record(LegislatorRecord),
    Dropped(DropReason),
}

/// Non-fatal problems found while reading a member page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseWarning {
    MemberElectMissingParty,
    NoPhoto,
    NoDistrict,
    NoAddress,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseWarning::MemberElectMissingParty => "member-elect missing party",
            ParseWarning::NoPhoto => "no member photo found",
            ParseWarning::NoDistrict => "member has no district listed; skipping",
            ParseWarning::NoAddress => "no district office address found",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMember {
    pub outcome: MemberOutcome,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedMember {
    pub fn record(&self) -> Option<&LegislatorRecord> {
        match &self.outcome {
            MemberOutcome::Record(r) => Some(r),
            MemberOutcome::Dropped(_) => None,
        }
    }

    pub fn into_record(self) -> Option<LegislatorRecord> {
        match self.outcome {
            MemberOutcome::Record(r) => Some(r),
            MemberOutcome::Dropped(_) => None,
        }
    }
}

/// Parse one member profile page.
///
/// Missing phone, email and occupation are silently left empty. A missing
/// photo or address is warned about and defaulted to "". A missing district
/// drops the member. An unrecognized party code is an error.
pub fn parse_member(
    html: &str,
    member_url: &str,
    default_chamber: Chamber,
    term: &str,
) -> Result<ParsedMember, ParseError> {
    let doc = Html::parse_document(html);
    let mut warnings = Vec::new();

    // Name line: "<Title> <name...> (<P>)"
    let name_line = doc.select(&NAME_SEL).next().map(elem_text).unwrap_or_default();
    let tokens: Vec<&str> = name_line.split_whitespace().collect();
    let [title, name_tokens @ .., marker] = tokens.as_slice() else {
        return Err(ParseError::MissingNameLine {
            url: member_url.to_string(),
        });
    };

    let chamber = chamber_from_title(title).unwrap_or(default_chamber);

    let (full_name, party) = match classify(title, marker) {
        PartyClass::Known(party) => (name_tokens.join(" "), party),
        PartyClass::ElectMissingParty => {
            warnings.push(ParseWarning::MemberElectMissingParty);
            (tokens[1..].join(" "), Party::Unknown)
        }
        PartyClass::Unrecognized(marker) => {
            return Err(ParseError::UnknownParty {
                marker,
                name: name_tokens.join(" "),
            });
        }
    };

    let photo_url = match doc
        .select(&PHOTO_SEL)
        .next()
        .and_then(|img| img.value().attr("src"))
    {
        Some(src) => resolve(member_url, src),
        None => {
            warnings.push(ParseWarning::NoPhoto);
            String::new()
        }
    };

    let info = doc
        .select(&INFO_SEL)
        .next()
        .map(InfoTable::from_element)
        .unwrap_or_default();
    debug!(url = %member_url, labels = ?info.labels().collect::<Vec<_>>(), "info table");

    let district = info.get("District").unwrap_or_default();
    let Some(mut leg) = LegislatorRecord::new(
        term,
        chamber,
        &district,
        &full_name,
        party,
        &photo_url,
        member_url,
    ) else {
        warnings.push(ParseWarning::NoDistrict);
        log_warnings(member_url, &warnings);
        return Ok(ParsedMember {
            outcome: MemberOutcome::Dropped(DropReason::NoDistrict),
            warnings,
        });
    };
    leg.add_source(member_url);

    let phone = info.get("Phone");
    let email = info.get("Email");

    // First text node under any <nobr>; the site uses &nbsp; inside addresses.
    let address = doc
        .select(&ADDRESS_SEL)
        .flat_map(|el| el.children())
        .find_map(|n| n.value().as_text().map(|t| String::from(&**t)))
        .map(|t| t.replace('\u{a0}', " ").trim().to_string());
    let address = match address {
        Some(a) if !a.is_empty() => a,
        _ => {
            warnings.push(ParseWarning::NoAddress);
            String::new()
        }
    };
    leg.add_office(OfficeRecord::district(address, phone, email));

    leg.occupation = info.get("Occupation");

    log_warnings(member_url, &warnings);
    Ok(ParsedMember {
        outcome: MemberOutcome::Record(leg),
        warnings,
    })
}

fn resolve(member_url: &str, src: &str) -> String {
    Url::parse(member_url)
        .and_then(|base| base.join(src.trim()))
        .map(String::from)
        .unwrap_or_else(|_| src.trim().to_string())
}

fn log_warnings(member_url: &str, warnings: &[ParseWarning]) {
    for w in warnings {
        warn!(url = %member_url, "{}", w);
    }
}
