use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::legislator::{Chamber, LegislatorRecord, OfficeRecord, Party};

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS legislators (
            id          INTEGER PRIMARY KEY,
            term        TEXT NOT NULL,
            chamber     TEXT NOT NULL CHECK(chamber IN ('upper','lower')),
            district    TEXT NOT NULL CHECK(district <> ''),
            full_name   TEXT NOT NULL,
            party       TEXT NOT NULL CHECK(party IN ('Republican','Democratic','Green','Independent','')),
            photo_url   TEXT NOT NULL DEFAULT '',
            source_url  TEXT NOT NULL,
            occupation  TEXT,
            scraped_at  TEXT NOT NULL,
            UNIQUE(term, chamber, district)
        );
        CREATE INDEX IF NOT EXISTS idx_legislators_term ON legislators(term);

        CREATE TABLE IF NOT EXISTS offices (
            id             INTEGER PRIMARY KEY,
            legislator_id  INTEGER NOT NULL REFERENCES legislators(id) ON DELETE CASCADE,
            kind           TEXT NOT NULL,
            label          TEXT NOT NULL,
            address        TEXT NOT NULL,
            phone          TEXT,
            email          TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_offices_legislator ON offices(legislator_id);

        CREATE TABLE IF NOT EXISTS sources (
            legislator_id  INTEGER NOT NULL REFERENCES legislators(id) ON DELETE CASCADE,
            url            TEXT NOT NULL,
            UNIQUE(legislator_id, url)
        );
        ",
    )?;
    Ok(())
}

// ── Saving ──

/// Insert or replace one legislator, keyed on (term, chamber, district).
pub fn save_legislator(conn: &Connection, leg: &LegislatorRecord) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let id = save_one(&tx, leg, &chrono::Utc::now().to_rfc3339())?;
    tx.commit()?;
    Ok(id)
}

fn save_one(conn: &Connection, leg: &LegislatorRecord, scraped_at: &str) -> Result<i64> {
    let id: i64 = conn.query_row(
        "INSERT INTO legislators
         (term, chamber, district, full_name, party, photo_url, source_url, occupation, scraped_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(term, chamber, district) DO UPDATE SET
            full_name = excluded.full_name,
            party = excluded.party,
            photo_url = excluded.photo_url,
            source_url = excluded.source_url,
            occupation = excluded.occupation,
            scraped_at = excluded.scraped_at
         RETURNING id",
        rusqlite::params![
            leg.term,
            leg.chamber.as_str(),
            leg.district,
            leg.full_name,
            leg.party.as_str(),
            leg.photo_url,
            leg.source_url,
            leg.occupation,
            scraped_at,
        ],
        |row| row.get(0),
    )?;

    conn.execute("DELETE FROM offices WHERE legislator_id = ?1", [id])?;
    conn.execute("DELETE FROM sources WHERE legislator_id = ?1", [id])?;

    let mut office_stmt = conn.prepare_cached(
        "INSERT INTO offices (legislator_id, kind, label, address, phone, email)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for o in &leg.offices {
        office_stmt.execute(rusqlite::params![id, o.kind, o.label, o.address, o.phone, o.email])?;
    }
    let mut source_stmt =
        conn.prepare_cached("INSERT OR IGNORE INTO sources (legislator_id, url) VALUES (?1, ?2)")?;
    for url in &leg.sources {
        source_stmt.execute(rusqlite::params![id, url])?;
    }
    Ok(id)
}

// ── Reading ──

pub fn load_legislators(conn: &Connection, term: Option<&str>) -> Result<Vec<LegislatorRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, term, chamber, district, full_name, party, photo_url, source_url, occupation
         FROM legislators
         WHERE ?1 IS NULL OR term = ?1
         ORDER BY term, chamber, CAST(district AS INTEGER), district",
    )?;
    let rows = stmt
        .query_map([term], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                LegislatorParts {
                    term: row.get(1)?,
                    chamber: row.get(2)?,
                    district: row.get(3)?,
                    full_name: row.get(4)?,
                    party: row.get(5)?,
                    photo_url: row.get(6)?,
                    source_url: row.get(7)?,
                    occupation: row.get(8)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut office_stmt = conn.prepare(
        "SELECT kind, label, address, phone, email FROM offices WHERE legislator_id = ?1 ORDER BY id",
    )?;
    let mut source_stmt =
        conn.prepare("SELECT url FROM sources WHERE legislator_id = ?1 ORDER BY rowid")?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, parts) in rows {
        let offices = office_stmt
            .query_map([id], |row| {
                Ok(OfficeRecord {
                    kind: row.get(0)?,
                    label: row.get(1)?,
                    address: row.get(2)?,
                    phone: row.get(3)?,
                    email: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let sources = source_stmt
            .query_map([id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        out.push(parts.into_record(offices, sources)?);
    }
    Ok(out)
}

struct LegislatorParts {
    term: String,
    chamber: String,
    district: String,
    full_name: String,
    party: String,
    photo_url: String,
    source_url: String,
    occupation: Option<String>,
}

impl LegislatorParts {
    fn into_record(self, offices: Vec<OfficeRecord>, sources: Vec<String>) -> Result<LegislatorRecord> {
        let chamber: Chamber = self.chamber.parse().map_err(|e: String| anyhow!(e))?;
        let party = Party::from_stored(&self.party)
            .ok_or_else(|| anyhow!("Unknown stored party '{}'", self.party))?;
        Ok(LegislatorRecord {
            term: self.term,
            chamber,
            district: self.district,
            full_name: self.full_name,
            party,
            photo_url: self.photo_url,
            source_url: self.source_url,
            sources,
            offices,
            occupation: self.occupation,
        })
    }
}

pub struct OverviewRow {
    pub term: String,
    pub chamber: String,
    pub district: String,
    pub full_name: String,
    pub party: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub fn fetch_overview(
    conn: &Connection,
    term: Option<&str>,
    chamber: Option<&str>,
    party: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut stmt = conn.prepare(
        "SELECT l.term, l.chamber, l.district, l.full_name, l.party, o.phone, o.email
         FROM legislators l
         LEFT JOIN offices o ON o.legislator_id = l.id AND o.kind = 'district'
         WHERE (?1 IS NULL OR l.term = ?1)
           AND (?2 IS NULL OR l.chamber = ?2)
           AND (?3 IS NULL OR l.party = ?3)
         ORDER BY l.term DESC, l.chamber, CAST(l.district AS INTEGER), l.district
         LIMIT ?4",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![term, chamber, party, limit as i64], |row| {
            Ok(OverviewRow {
                term: row.get(0)?,
                chamber: row.get(1)?,
                district: row.get(2)?,
                full_name: row.get(3)?,
                party: row.get(4)?,
                phone: row.get(5)?,
                email: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: i64,
    pub upper: i64,
    pub lower: i64,
    pub terms: i64,
    pub by_party: Vec<(String, i64)>,
    pub without_photo: i64,
    pub last_scraped: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

    let mut stmt = conn.prepare(
        "SELECT party, COUNT(*) FROM legislators GROUP BY party ORDER BY COUNT(*) DESC, party",
    )?;
    let by_party: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        total: count("SELECT COUNT(*) FROM legislators")?,
        upper: count("SELECT COUNT(*) FROM legislators WHERE chamber = 'upper'")?,
        lower: count("SELECT COUNT(*) FROM legislators WHERE chamber = 'lower'")?,
        terms: count("SELECT COUNT(DISTINCT term) FROM legislators")?,
        by_party,
        without_photo: count("SELECT COUNT(*) FROM legislators WHERE photo_url = ''")?,
        last_scraped: conn
            .query_row("SELECT MAX(scraped_at) FROM legislators", [], |r| {
                r.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn record(district: &str, name: &str, party: Party) -> LegislatorRecord {
        let url = format!("http://example.com/member?d={}", district);
        let mut leg =
            LegislatorRecord::new("2013-2014", Chamber::Lower, district, name, party, "", &url).unwrap();
        leg.add_source(&url);
        leg.add_office(OfficeRecord::district(
            "1 Main St".into(),
            Some("501-555-0100".into()),
            None,
        ));
        leg
    }

    #[test]
    fn save_and_load_round_trip() {
        let conn = mem();
        let mut leg = record("5", "Jane Q. Doe", Party::Republican);
        leg.occupation = Some("Farmer".into());
        save_legislator(&conn, &leg).unwrap();

        let loaded = load_legislators(&conn, Some("2013-2014")).unwrap();
        assert_eq!(loaded, vec![leg]);
        assert!(load_legislators(&conn, Some("2015-2016")).unwrap().is_empty());
    }

    #[test]
    fn resave_replaces() {
        let conn = mem();
        save_legislator(&conn, &record("5", "Jane Doe", Party::Republican)).unwrap();
        save_legislator(&conn, &record("5", "Jane Q. Doe", Party::Democratic)).unwrap();

        let loaded = load_legislators(&conn, None).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].full_name, "Jane Q. Doe");
        assert_eq!(loaded[0].offices.len(), 1);
        assert_eq!(loaded[0].sources.len(), 1);
    }

    #[test]
    fn empty_party_is_stored() {
        let conn = mem();
        save_legislator(&conn, &record("77", "Amy Lee Green", Party::Unknown)).unwrap();
        let loaded = load_legislators(&conn, None).unwrap();
        assert_eq!(loaded[0].party, Party::Unknown);
    }

    #[test]
    fn batch_save_and_stats() {
        let conn = mem();
        let legs = vec![
            record("1", "A", Party::Republican),
            record("2", "B", Party::Republican),
            record("10", "C", Party::Democratic),
        ];
        for leg in &legs {
            save_legislator(&conn, leg).unwrap();
        }

        let s = get_stats(&conn).unwrap();
        assert_eq!(s.total, 3);
        assert_eq!(s.lower, 3);
        assert_eq!(s.upper, 0);
        assert_eq!(s.terms, 1);
        assert_eq!(s.by_party[0], ("Republican".to_string(), 2));
        assert_eq!(s.without_photo, 3);
        assert!(s.last_scraped.is_some());
    }

    #[test]
    fn overview_filters_and_orders() {
        let conn = mem();
        let legs = vec![
            record("10", "C", Party::Democratic),
            record("2", "B", Party::Republican),
            record("1", "A", Party::Republican),
        ];
        for leg in &legs {
            save_legislator(&conn, leg).unwrap();
        }

        let rows = fetch_overview(&conn, None, Some("lower"), Some("Republican"), 50).unwrap();
        let districts: Vec<&str> = rows.iter().map(|r| r.district.as_str()).collect();
        assert_eq!(districts, vec!["1", "2"]);
        assert_eq!(rows[0].phone.as_deref(), Some("501-555-0100"));

        let all = fetch_overview(&conn, None, None, None, 2).unwrap();
        assert_eq!(all.len(), 2);
    }
}
