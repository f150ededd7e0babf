//! Fixed insert rows and the SELECT statement guard.

/// One hard-coded patient row. Identity comes solely from the table's
/// auto-increment primary key.
#[derive(Debug, Clone, Copy)]
pub struct PatientRecord {
    pub name: &'static str,
    pub age: i32,
    pub city: &'static str,
}

/// The fixed set inserted verbatim on every insert call.
pub const FIXED_PATIENT_ROWS: [PatientRecord; 3] = [
    PatientRecord {
        name: "Alex",
        age: 22,
        city: "Vancouver",
    },
    PatientRecord {
        name: "Jack",
        age: 30,
        city: "Burnaby",
    },
    PatientRecord {
        name: "Rose",
        age: 28,
        city: "Richmond",
    },
];

/// Prefix check only, intentionally not a parser: the trimmed,
/// uppercased statement must start with the literal token `SELECT `
/// (trailing space required). Stacked statements, comments, and the
/// like pass through; the reader account's restricted privileges are
/// the real enforcement.
pub fn looks_like_select_only(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("SELECT ")
}

/// Strip one layer of surrounding matching quote characters from a
/// path-supplied statement (`"select ..."` or `'select ...'`), then
/// re-trim. Anything else comes back trimmed but otherwise untouched.
pub fn strip_quote_pair(sql: &str) -> &str {
    let trimmed = sql.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}
