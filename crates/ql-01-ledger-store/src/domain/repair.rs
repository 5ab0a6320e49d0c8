//! # Chain Document Repair
//!
//! Best-effort syntactic repair of a persisted chain that failed to parse.
//!
//! ## Algorithm
//!
//! 1. Scan the document tracking string literals and nesting depth
//! 2. Drop any comma whose next non-whitespace character closes an object or array
//! 3. Stop at the close of the top-level value and drop whatever follows
//! 4. Return the repaired text and a report, or `None` if nothing changed
//!
//! Repair never invents content. A repaired document still has to parse and
//! pass full chain validation before the ledger uses it.

/// What a repair pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Trailing commas removed before `}` or `]`.
    pub trailing_commas_removed: usize,
    /// Non-whitespace bytes dropped after the top-level value.
    pub trailing_bytes_dropped: usize,
    /// Where the original document was backed up, if anywhere.
    pub backup_path: Option<String>,
}

impl RepairReport {
    /// True if the pass changed anything.
    pub fn changed(&self) -> bool {
        self.trailing_commas_removed > 0 || self.trailing_bytes_dropped > 0
    }
}

/// Attempt one repair pass over `raw`.
pub fn repair_chain_document(raw: &str) -> Option<(String, RepairReport)> {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut report = RepairReport::default();

    let mut in_string = false;
    let mut escaped = false;
    let mut depth: usize = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '[' | '{' => {
                depth += 1;
                out.push(c);
            }
            ']' | '}' => {
                out.push(c);
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    report.trailing_bytes_dropped = chars[i + 1..]
                        .iter()
                        .filter(|ch| !ch.is_whitespace())
                        .count();
                    break;
                }
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if matches!(next, Some('}') | Some(']')) {
                    report.trailing_commas_removed += 1;
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }

    if report.changed() {
        out.push('\n');
        Some((out, report))
    } else {
        None
    }
}
