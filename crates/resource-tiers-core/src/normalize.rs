//! Record normalization.
//!
//! Maps the two stored encodings onto one [`NormalizedResource`]:
//!
//! | Shape | Detection | Fields |
//! |-------|-----------|--------|
//! | CURRENT | `metadata.title` is set (any non-empty string, non-zero number, `true`, array or object) | `metadata{title,type,created_at}`, `content{company,location}`, `visibility{access_level,status,..}` |
//! | LEGACY | anything else | flat `title`, `type`, `company`, `location`, `status`, `created_at` |
//!
//! The shape is resolved once, here. Downstream code reads only the
//! normalized view. [`normalize`] is total: absent or malformed fields fall
//! back to the documented defaults (`"Untitled"`, `job`, `active`, empty
//! strings). [`normalize_strict`] is the opt-in validating variant.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{Result, TierError};
use crate::models::{
    AccessTier, NormalizedResource, RawRecord, RecordShape, ResourceStatus, ResourceType,
    TierAssignment,
};

/// Title substituted when a record carries none.
pub const UNTITLED: &str = "Untitled";

/// Epoch values above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// A record with its shape resolved and its field groups borrowed.
enum Parsed<'a> {
    Legacy {
        root: Option<&'a Map<String, Value>>,
    },
    Current {
        root: &'a Map<String, Value>,
        metadata: &'a Map<String, Value>,
        content: Option<&'a Map<String, Value>>,
        visibility: Option<&'a Map<String, Value>>,
    },
}

impl<'a> Parsed<'a> {
    fn parse(doc: &'a Value) -> Self {
        let root = doc.as_object();
        if let Some(root) = root {
            if let Some(metadata) = root.get("metadata").and_then(Value::as_object) {
                if marks_current(metadata.get("title")) {
                    return Parsed::Current {
                        root,
                        metadata,
                        content: root.get("content").and_then(Value::as_object),
                        visibility: root.get("visibility").and_then(Value::as_object),
                    };
                }
            }
        }
        Parsed::Legacy { root }
    }

    fn shape(&self) -> RecordShape {
        match self {
            Parsed::Legacy { .. } => RecordShape::Legacy,
            Parsed::Current { .. } => RecordShape::Current,
        }
    }

    fn title(&self) -> Option<&'a str> {
        match self {
            Parsed::Legacy { root } => field(*root, "title"),
            Parsed::Current { metadata, .. } => non_empty(metadata.get("title")),
        }
    }

    fn resource_type(&self) -> Option<&'a str> {
        match self {
            Parsed::Legacy { root } => field(*root, "type"),
            Parsed::Current { metadata, .. } => non_empty(metadata.get("type")),
        }
    }

    fn company(&self) -> Option<&'a str> {
        match self {
            Parsed::Legacy { root } => field(*root, "company"),
            Parsed::Current { content, .. } => field(*content, "company"),
        }
    }

    fn location(&self) -> Option<&'a str> {
        match self {
            Parsed::Legacy { root } => field(*root, "location"),
            Parsed::Current { content, .. } => field(*content, "location"),
        }
    }

    fn status(&self) -> Option<&'a str> {
        match self {
            Parsed::Legacy { root } => field(*root, "status"),
            Parsed::Current {
                root, visibility, ..
            } => field(*visibility, "status").or_else(|| field(Some(*root), "status")),
        }
    }

    fn created_at(&self) -> Option<&'a Value> {
        match self {
            Parsed::Legacy { root } => root.and_then(|r| r.get("created_at")),
            Parsed::Current { root, metadata, .. } => metadata
                .get("created_at")
                .filter(|v| !v.is_null())
                .or_else(|| root.get("created_at")),
        }
    }

    /// Raw `access_level` for CURRENT records; legacy records have none.
    fn access_level(&self) -> Option<&'a Value> {
        match self {
            Parsed::Legacy { .. } => None,
            Parsed::Current { visibility, .. } => visibility.and_then(|v| v.get("access_level")),
        }
    }

    fn access_tier(&self) -> TierAssignment {
        match self {
            Parsed::Legacy { .. } => TierAssignment::Assigned(AccessTier::Free),
            Parsed::Current { .. } => match self.access_level() {
                Some(level) if is_truthy(level) => {
                    let tier = level
                        .as_str()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(AccessTier::Free);
                    TierAssignment::Assigned(tier)
                }
                _ => TierAssignment::Unassigned,
            },
        }
    }
}

fn field<'a>(group: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    group.and_then(|g| non_empty(g.get(key)))
}

fn non_empty(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Shape marker: any set `metadata.title`, including whitespace-only text.
fn marks_current(title: Option<&Value>) -> bool {
    match title {
        Some(Value::String(s)) => !s.is_empty(),
        Some(other) => is_truthy(other),
        None => false,
    }
}

/// Presence test for stored flags: null, false, 0 and "" count as unset.
pub(crate) fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 strings, epoch seconds or milliseconds, and
/// `{seconds, nanoseconds}` objects (with or without leading underscores).
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let n = n.as_i64()?;
            if n.abs() >= MILLIS_THRESHOLD {
                Utc.timestamp_millis_opt(n).single()
            } else {
                Utc.timestamp_opt(n, 0).single()
            }
        }
        Value::Object(obj) => {
            let secs = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = obj
                .get("nanoseconds")
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

/// Normalize a stored record. Pure and total.
pub fn normalize(raw: &RawRecord) -> NormalizedResource {
    let parsed = Parsed::parse(&raw.doc);

    NormalizedResource {
        id: raw.id.clone(),
        title: parsed.title().unwrap_or(UNTITLED).to_string(),
        resource_type: parsed
            .resource_type()
            .and_then(|s| s.parse().ok())
            .unwrap_or(ResourceType::Job),
        company: parsed.company().unwrap_or_default().to_string(),
        location: parsed.location().unwrap_or_default().to_string(),
        status: parsed
            .status()
            .and_then(|s| s.parse().ok())
            .unwrap_or(ResourceStatus::Active),
        access_tier: parsed.access_tier(),
        created_at: parsed.created_at().and_then(parse_timestamp),
        shape: parsed.shape(),
    }
}

/// Normalize every record in a scan, preserving order.
pub fn normalize_all(records: &[RawRecord]) -> Vec<NormalizedResource> {
    records.iter().map(normalize).collect()
}

/// Validating variant of [`normalize`] for callers that want to reject
/// incomplete documents instead of defaulting them.
///
/// Fails with [`TierError::MalformedInput`] when the document is not an
/// object, has no title, or carries an unrecognized `type`, `status`, or
/// `access_level`.
pub fn normalize_strict(raw: &RawRecord) -> Result<NormalizedResource> {
    let malformed = |what: String| TierError::MalformedInput(format!("{}: {}", raw.id, what));

    if !raw.doc.is_object() {
        return Err(malformed("document is not an object".to_string()));
    }
    let parsed = Parsed::parse(&raw.doc);

    if parsed.title().is_none() {
        return Err(malformed("missing title".to_string()));
    }
    match parsed.resource_type() {
        None => return Err(malformed("missing type".to_string())),
        Some(t) if t.parse::<ResourceType>().is_err() => {
            return Err(malformed(format!("unrecognized type '{}'", t)))
        }
        Some(_) => {}
    }
    if let Some(s) = parsed.status() {
        if s.parse::<ResourceStatus>().is_err() {
            return Err(malformed(format!("unrecognized status '{}'", s)));
        }
    }
    if let Some(level) = parsed.access_level().filter(|v| is_truthy(v)) {
        if level.as_str().and_then(|s| s.parse::<AccessTier>().ok()).is_none() {
            return Err(malformed(format!("unrecognized access_level {}", level)));
        }
    }

    Ok(normalize(raw))
}
