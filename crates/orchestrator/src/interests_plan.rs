//! `manage_interests` node (spec §4.9): a two-phase SQL-like protocol. The
//! LM emits one or more lines from a closed vocabulary; each maps to a
//! tagged [`InterestOp`] variant rather than a string-keyed dispatch (spec
//! §9 "Dynamic dispatch to replace") — an unrecognized line becomes
//! `Unknown`, never silently ignored.

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterestOp {
    Query,
    QueryRelated(String),
    Add(Vec<String>),
    Remove(Vec<String>),
    Clear,
    Replace(Vec<String>, Vec<String>),
    Unknown(String),
}

/// Parse one protocol line into its tagged variant (spec §4.9). Anything
/// that doesn't match a known prefix becomes `Unknown(line)`.
pub fn parse_plan_line(line: &str) -> InterestOp {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("QUERY_RELATED:") {
        return InterestOp::QueryRelated(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("ADD:") {
        return InterestOp::Add(split_csv(rest));
    }
    if let Some(rest) = line.strip_prefix("REMOVE:") {
        return InterestOp::Remove(split_csv(rest));
    }
    if let Some(rest) = line.strip_prefix("REPLACE:") {
        let mut parts = rest.splitn(2, '|');
        let remove = split_csv(parts.next().unwrap_or(""));
        let add = split_csv(parts.next().unwrap_or(""));
        return InterestOp::Replace(remove, add);
    }
    if line.strip_prefix("QUERY:").is_some() || line == "QUERY" {
        return InterestOp::Query;
    }
    if line.strip_prefix("CLEAR:").is_some() || line == "CLEAR" {
        return InterestOp::Clear;
    }
    if let Some(rest) = line.strip_prefix("UNKNOWN:") {
        return InterestOp::Unknown(rest.trim().to_string());
    }
    InterestOp::Unknown(line.to_string())
}

pub fn parse_plan(raw: &str) -> Vec<InterestOp> {
    raw.lines().map(str::trim).filter(|l| !l.is_empty()).map(parse_plan_line).collect()
}

/// Outcome of executing one plan line, reported individually (spec §7
/// "Interest-plan lines fail independently; the user sees a line-by-line
/// outcome").
#[derive(Debug, Clone, PartialEq)]
pub struct InterestOutcome {
    pub op: String,
    pub success: bool,
    pub detail: String,
}
