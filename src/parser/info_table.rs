use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{elem_text, normalize_whitespace};

static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// Labels that may share a single cell with their value ("District: 5").
const KNOWN_LABELS: &[&str] = &[
    "District",
    "Phone",
    "Email",
    "Occupation",
    "Seniority",
    "Church Affiliation",
    "Veteran",
    "Public Service",
];

/// Label → value pairs read from the member page's `table.InfoTable`.
#[derive(Debug, Default, Clone)]
pub struct InfoTable {
    fields: Vec<(String, String)>,
    flat: String,
}

impl InfoTable {
    pub fn from_element(table: ElementRef) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();

        for row in table.select(&ROW_SEL) {
            let cells: Vec<ElementRef> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .collect();

            if let Some((label, value)) = row_fields(&cells) {
                if !fields.iter().any(|(l, _)| l == &label) {
                    fields.push((label, value));
                }
            }
        }

        InfoTable {
            fields,
            flat: elem_text(table),
        }
    }

    /// Value for `label` (case-insensitive). Blank values read as absent.
    /// Labels the rows did not yield are looked up in the flattened table text.
    pub fn get(&self, label: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| flat_lookup(&self.flat, label))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(l, _)| l.as_str())
    }
}

/// The label → value pair of one row. Blank leading cells are skipped; the
/// first remaining cell either carries "Label value" itself or is the label
/// for the cells after it.
fn row_fields(cells: &[ElementRef]) -> Option<(String, String)> {
    let texts: Vec<String> = cells.iter().map(|c| elem_text(*c)).collect();
    let start = texts.iter().position(|t| !normalize_label(t).is_empty())?;
    let first = &texts[start];

    match split_labelled(first) {
        Some((label, value)) if !value.is_empty() => Some((label, value)),
        inline if start + 1 == texts.len() => inline,
        _ => Some((
            normalize_label(first),
            clean_value(&texts[start + 1..].join(" ")),
        )),
    }
}

fn normalize_label(raw: &str) -> String {
    normalize_whitespace(raw)
        .trim_end_matches(':')
        .trim()
        .to_string()
}

fn clean_value(raw: &str) -> String {
    normalize_whitespace(raw)
        .trim_start_matches(':')
        .trim()
        .to_string()
}

fn split_labelled(cell: &str) -> Option<(String, String)> {
    let text = normalize_whitespace(cell);
    KNOWN_LABELS.iter().find_map(|label| {
        let rest = text.strip_prefix(label)?;
        // "Districts" is not "District".
        if rest.chars().next().is_some_and(|c| c.is_alphanumeric()) {
            return None;
        }
        Some((label.to_string(), clean_value(rest)))
    })
}

static FLAT_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    KNOWN_LABELS
        .iter()
        .map(|label| {
            let re = Regex::new(&format!(r"{}\b(.+?)\r?(?:\n|$)", regex::escape(label))).unwrap();
            (*label, re)
        })
        .collect()
});

/// What follows a known label in the flattened table text, up to the line end.
fn flat_lookup(flat: &str, label: &str) -> Option<String> {
    let (_, re) = FLAT_RES.iter().find(|(l, _)| l.eq_ignore_ascii_case(label))?;
    re.captures(flat)
        .map(|c| clean_value(&c[1]))
        .filter(|v| !v.is_empty())
}
