//! Total decoders for raw directory attribute values.
//!
//! Every decoder returns an explicit "absent" value instead of erroring, so
//! downstream logic can tell "not present" from "present and zero". None of
//! these functions ever panic.

use chrono::{DateTime, Utc};
use ldap3::SearchEntry;
use tracing::debug;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01 (Unix epoch).
const FILETIME_UNIX_DIFF_SECS: i64 = 11_644_473_600;

/// Decode a FILETIME-style attribute: a decimal string counting
/// 100-nanosecond intervals since 1601-01-01 UTC.
///
/// Empty input, `"0"`, negative values, and parse failures all decode to
/// `None`.
pub fn decode_filetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "0" {
        return None;
    }
    let intervals: i64 = raw.parse().ok()?;
    if intervals <= 0 {
        return None;
    }
    filetime_to_utc(intervals)
}

/// Decode `accountExpires` and similar attributes where both `0` and
/// `i64::MAX` are reserved sentinels meaning "never".
pub fn decode_account_expires(raw: &str) -> Option<DateTime<Utc>> {
    let intervals: i64 = raw.trim().parse().ok()?;
    if intervals <= 0 || intervals == i64::MAX {
        return None;
    }
    filetime_to_utc(intervals)
}

fn filetime_to_utc(intervals: i64) -> Option<DateTime<Utc>> {
    let unix_secs = intervals / 10_000_000 - FILETIME_UNIX_DIFF_SECS;
    if unix_secs < 0 {
        return None;
    }
    let nanos = (intervals % 10_000_000) as u32 * 100;
    DateTime::from_timestamp(unix_secs, nanos)
}

/// Parse a bit-flag attribute such as `userAccountControl`; 0 on failure.
pub fn decode_flags(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

/// First value of an attribute, or empty string if missing.
pub fn first_attr(entry: &SearchEntry, attr: &str) -> String {
    entry
        .attrs
        .get(attr)
        .and_then(|v| v.first())
        .cloned()
        .unwrap_or_default()
}

/// First value of an attribute as an `Option`.
pub fn optional_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|v| v.first()).cloned()
}

/// All values of a possibly multi-valued attribute; empty when absent.
pub fn multi_values(entry: &SearchEntry, attr: &str) -> Vec<String> {
    entry.attrs.get(attr).cloned().unwrap_or_default()
}

/// Extract the value of the leading CN component of a distinguished name.
///
/// The component boundary is the first unescaped comma; `\,` and `\\`
/// escapes inside the value are resolved, so a CN that itself contains a
/// comma survives intact.
pub fn cn_from_dn(dn: &str) -> Option<String> {
    let mut rdn = String::new();
    let mut escaped = false;
    for c in dn.chars() {
        if escaped {
            rdn.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ',' {
            break;
        } else {
            rdn.push(c);
        }
    }
    let rdn = rdn.trim();
    let value = rdn.strip_prefix("CN=").or_else(|| rdn.strip_prefix("cn="))?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A decoded attribute value for the raw detail-view bag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Texts(Vec<String>),
    Timestamp(DateTime<Utc>),
    Flags(u32),
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Texts(v) => f.write_str(&v.join("; ")),
            Self::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%SZ")),
            Self::Flags(v) => write!(f, "{v} (0x{v:X})"),
        }
    }
}

/// Attributes decoded as FILETIME timestamps in the raw bag.
const TIMESTAMP_ATTRS: &[&str] = &[
    "pwdLastSet",
    "lockoutTime",
    "badPasswordTime",
    "lastLogon",
    "lastLogonTimestamp",
];

/// Attributes decoded via the "never" sentinels.
const EXPIRY_ATTRS: &[&str] = &["accountExpires", "msDS-UserPasswordExpiryTimeComputed"];

/// Build an ordered attribute-name → decoded-value map for detail views.
///
/// This is a boundary representation only; the typed model never carries a
/// loose dictionary. A value that fails its preferred decoding is kept in
/// its raw text form rather than dropped, so one bad property never hides
/// the rest of the projection.
pub fn raw_attribute_map(entry: &SearchEntry) -> Vec<(String, AttributeValue)> {
    let mut out: Vec<(String, AttributeValue)> = Vec::with_capacity(entry.attrs.len());

    for (name, values) in &entry.attrs {
        let value = decode_one(name, values);
        out.push((name.clone(), value));
    }

    out.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
    out
}

fn decode_one(name: &str, values: &[String]) -> AttributeValue {
    if values.len() > 1 {
        return AttributeValue::Texts(values.to_vec());
    }
    let raw = values.first().map(String::as_str).unwrap_or("");

    if TIMESTAMP_ATTRS.iter().any(|a| a.eq_ignore_ascii_case(name)) {
        if let Some(ts) = decode_filetime(raw) {
            return AttributeValue::Timestamp(ts);
        }
        debug!(attr = name, raw, "timestamp attribute kept in raw form");
    } else if EXPIRY_ATTRS.iter().any(|a| a.eq_ignore_ascii_case(name)) {
        if let Some(ts) = decode_account_expires(raw) {
            return AttributeValue::Timestamp(ts);
        }
        debug!(attr = name, raw, "expiry attribute kept in raw form");
    } else if name.eq_ignore_ascii_case("userAccountControl") {
        return AttributeValue::Flags(decode_flags(raw));
    }

    AttributeValue::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;

    use super::*;

    fn entry(attrs: Vec<(&str, Vec<&str>)>) -> SearchEntry {
        SearchEntry {
            dn: "CN=Test,DC=example,DC=com".into(),
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    // pwdLastSet for 2024-01-01T00:00:00Z:
    // (11644473600 + 1704067200) * 10^7 = 133485408000000000
    const JAN_1_2024: &str = "133485408000000000";

    #[test]
    fn filetime_known_value() {
        let ts = decode_filetime(JAN_1_2024).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn filetime_absent_inputs_are_none() {
        for raw in ["", "0", "  ", "not-a-number", "-1", "12e9"] {
            assert_eq!(decode_filetime(raw), None, "raw: {raw:?}");
        }
    }

    #[test]
    fn filetime_subsecond_precision() {
        // One and a half seconds past the epoch boundary value above
        let raw = "133485408015000000";
        let ts = decode_filetime(raw).unwrap();
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap() + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn account_expires_never_sentinels() {
        assert_eq!(decode_account_expires("0"), None);
        assert_eq!(decode_account_expires(&i64::MAX.to_string()), None);
        assert_eq!(decode_account_expires("garbage"), None);
        assert!(decode_account_expires(JAN_1_2024).is_some());
    }

    #[test]
    fn flags_parse_failure_is_zero() {
        assert_eq!(decode_flags("514"), 514);
        assert_eq!(decode_flags(""), 0);
        assert_eq!(decode_flags("abc"), 0);
        assert_eq!(decode_flags("-5"), 0);
    }

    #[test]
    fn attr_helpers() {
        let e = entry(vec![
            ("sAMAccountName", vec!["jdoe"]),
            ("memberOf", vec!["CN=A,DC=x", "CN=B,DC=x"]),
        ]);
        assert_eq!(first_attr(&e, "sAMAccountName"), "jdoe");
        assert_eq!(first_attr(&e, "missing"), "");
        assert_eq!(optional_attr(&e, "missing"), None);
        assert_eq!(multi_values(&e, "memberOf").len(), 2);
        assert!(multi_values(&e, "missing").is_empty());
    }

    #[test]
    fn cn_extraction() {
        assert_eq!(
            cn_from_dn("CN=Domain Admins,CN=Users,DC=example,DC=com").as_deref(),
            Some("Domain Admins")
        );
        assert_eq!(cn_from_dn("OU=Sales,DC=example,DC=com"), None);
        assert_eq!(cn_from_dn("CN=,DC=example,DC=com"), None);
    }

    #[test]
    fn cn_extraction_resolves_escapes() {
        // An escaped comma belongs to the CN value, not the component break
        assert_eq!(
            cn_from_dn("CN=Doe\\, John,OU=Users,DC=example,DC=com").as_deref(),
            Some("Doe, John")
        );
        assert_eq!(
            cn_from_dn("CN=Acme \\\\ Sons\\, Inc,OU=Partners,DC=example,DC=com").as_deref(),
            Some("Acme \\ Sons, Inc")
        );
    }

    #[test]
    fn raw_map_is_sorted_and_typed() {
        let e = entry(vec![
            ("userAccountControl", vec!["512"]),
            ("pwdLastSet", vec![JAN_1_2024]),
            ("displayName", vec!["John Doe"]),
            ("memberOf", vec!["CN=A,DC=x", "CN=B,DC=x"]),
        ]);
        let map = raw_attribute_map(&e);
        let names: Vec<&str> = map.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["displayName", "memberOf", "pwdLastSet", "userAccountControl"]
        );
        assert!(matches!(map[2].1, AttributeValue::Timestamp(_)));
        assert_eq!(map[3].1, AttributeValue::Flags(512));
        assert!(matches!(map[1].1, AttributeValue::Texts(_)));
    }

    #[test]
    fn raw_map_keeps_undecodable_values_as_text() {
        let e = entry(vec![("pwdLastSet", vec!["bogus"])]);
        let map = raw_attribute_map(&e);
        assert_eq!(map[0].1, AttributeValue::Text("bogus".into()));
    }

    #[test]
    fn attribute_value_display() {
        assert_eq!(AttributeValue::Flags(514).to_string(), "514 (0x202)");
        assert_eq!(
            AttributeValue::Texts(vec!["a".into(), "b".into()]).to_string(),
            "a; b"
        );
    }
}
