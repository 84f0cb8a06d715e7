//! Parsers for the minimal text feeds.
//!
//! The roster feed is one member per line, fields joined with `##`.  The
//! separator collides with language names ending in `#`, so those are
//! rewritten before splitting, exactly as the feed's consumers must.

use tally_roster::{BitSeq, FetchError, ItemInfo, Profile};

/// Value recorded for a text field the feed left empty.
const UNDEFINED: &str = "Undefined";

/// Parse the roster feed: `alias##name##locale##language##solved##level##solves`.
pub fn parse_roster_feed(text: &str) -> Result<Vec<Profile>, FetchError> {
    let mut profiles = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        profiles.push(parse_feed_line(line)?);
    }
    Ok(profiles)
}

fn parse_feed_line(line: &str) -> Result<Profile, FetchError> {
    // `##` is the field separator, so `C#` and `F#` followed by a separator
    // read as `###`.  Rewrite them before splitting.
    let line = line.replace("C###", "Csharp##").replace("F###", "Fsharp##");
    let fields: Vec<&str> = line.split("##").collect();
    if fields.len() != 7 {
        return Err(FetchError::Structure(format!(
            "roster feed line has {} fields, expected 7",
            fields.len()
        )));
    }
    if fields[0].is_empty() {
        return Err(FetchError::Structure("roster feed line has no alias".into()));
    }

    Ok(Profile {
        alias: fields[0].to_string(),
        display_name: text_or_undefined(fields[1]),
        locale: text_or_undefined(fields[2]),
        language: text_or_undefined(fields[3]),
        solve_count: int_or_zero(fields[4])?,
        level: int_or_zero(fields[5])?,
        solves: BitSeq::parse_lenient(fields[6]),
    })
}

fn text_or_undefined(field: &str) -> String {
    if field.is_empty() {
        UNDEFINED.to_string()
    } else {
        field.to_string()
    }
}

fn int_or_zero(field: &str) -> Result<u32, FetchError> {
    if field.is_empty() {
        return Ok(0);
    }
    field
        .parse()
        .map_err(|_| FetchError::Structure(format!("non-numeric feed field {field:?}")))
}

/// Parse the item catalog feed: `id##title##published##solvers##0` per line,
/// with a header line and trailing blank skipped.
pub fn parse_catalog_feed(text: &str) -> Result<Vec<ItemInfo>, FetchError> {
    let mut items = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split("##").collect();
        if fields.len() < 4 {
            continue;
        }
        // The header line has no numeric id.
        let Ok(id) = fields[0].parse::<u32>() else {
            continue;
        };
        let published_unix = fields[2].parse::<i64>().map_err(|_| {
            FetchError::Structure(format!("item {id} has non-numeric publish date"))
        })?;
        let solver_count = fields[3].parse::<u32>().map_err(|_| {
            FetchError::Structure(format!("item {id} has non-numeric solver count"))
        })?;
        items.push(ItemInfo {
            id,
            title: fields[1].to_string(),
            published_unix,
            solver_count,
        });
    }
    Ok(items)
}

// ── Tests ────────────────────────────────────────────────────────────────────
