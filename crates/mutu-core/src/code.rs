//! Business code generation (`RTL-2025-001`, `IND-AKADEMIK-004`, ...).
//!
//! The next code follows the highest numeric suffix among existing codes
//! that share the prefix, so sequences restart at `001` every year. Codes
//! whose suffix is not all digits never feed the sequence.

use sqlx::SqliteConnection;

use crate::Result;

/// Yearly code families and their prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFamily {
    AuditFinding,
    Rtl,
    Rtm,
    RtmAction,
    Monitoring,
    Standard,
    Survey,
    SurveyResponse,
}

impl CodeFamily {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::AuditFinding => "AUD",
            Self::Rtl => "RTL",
            Self::Rtm => "RTM",
            Self::RtmAction => "RTM-ACT",
            Self::Monitoring => "MON",
            Self::Standard => "STD",
            Self::Survey => "SURV",
            Self::SurveyResponse => "RESP",
        }
    }

    const fn table_column(self) -> (&'static str, &'static str) {
        match self {
            Self::AuditFinding => ("audit_findings", "finding_code"),
            Self::Rtl => ("rtls", "rtl_code"),
            Self::Rtm => ("rtms", "rtm_code"),
            Self::RtmAction => ("rtm_action_items", "action_code"),
            Self::Monitoring => ("indicator_monitorings", "code"),
            Self::Standard => ("spmi_standards", "code"),
            Self::Survey => ("surveys", "code"),
            Self::SurveyResponse => ("survey_responses", "code"),
        }
    }

    #[must_use]
    pub fn year_prefix(self, year: i32) -> String {
        format!("{}-{year}-", self.prefix())
    }
}

/// Prefix for indicator codes, e.g. `IND-AKADEMIK-`.
#[must_use]
pub fn indicator_prefix(category: &str) -> String {
    let category: String = category
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("IND-{category}-")
}

/// Numeric suffix of `code` under `prefix`, if it is all digits.
fn sequence_number(prefix: &str, code: &str) -> Option<u32> {
    code.strip_prefix(prefix)
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|suffix| suffix.parse().ok())
}

/// Next code for `prefix` given the codes already issued under it.
#[must_use]
pub fn next_in_sequence<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let next = existing
        .into_iter()
        .filter_map(|code| sequence_number(prefix, code))
        .max()
        .map_or(1, |n| n.saturating_add(1));
    format!("{prefix}{next:03}")
}

pub async fn next_yearly_code(
    conn: &mut SqliteConnection,
    family: CodeFamily,
    year: i32,
) -> Result<String> {
    let (table, column) = family.table_column();
    next_code(conn, table, column, &family.year_prefix(year)).await
}

pub async fn next_indicator_code(conn: &mut SqliteConnection, category: &str) -> Result<String> {
    next_code(conn, "spmi_indicators", "code", &indicator_prefix(category)).await
}

async fn next_code(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    prefix: &str,
) -> Result<String> {
    let sql = format!("SELECT {column} FROM {table} WHERE substr({column}, 1, length(?)) = ?");
    let codes: Vec<(String,)> = sqlx::query_as(&sql)
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&mut *conn)
        .await?;
    Ok(next_in_sequence(prefix, codes.iter().map(|(c,)| c.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_code_of_year_is_001() {
        assert_eq!(
            next_in_sequence(&CodeFamily::Rtl.year_prefix(2025), []),
            "RTL-2025-001"
        );
    }

    #[test]
    fn increments_highest_suffix() {
        assert_eq!(
            next_in_sequence("AUD-2025-", ["AUD-2025-003", "AUD-2025-009", "AUD-2025-004"]),
            "AUD-2025-010"
        );
    }

    #[test]
    fn action_codes_use_compound_prefix() {
        assert_eq!(
            next_in_sequence(&CodeFamily::RtmAction.year_prefix(2025), ["RTM-ACT-2025-041"]),
            "RTM-ACT-2025-042"
        );
    }

    #[test]
    fn non_numeric_suffixes_are_ignored() {
        assert_eq!(
            next_in_sequence("RTL-2026-", ["RTL-2026-001", "RTL-2026-X01", "RTL-2026-"]),
            "RTL-2026-002"
        );
        assert_eq!(next_in_sequence("RTL-2026-", ["RTL-2026-X01"]), "RTL-2026-001");
    }

    #[test]
    fn sequence_continues_past_999() {
        assert_eq!(next_in_sequence("MON-2025-", ["MON-2025-999"]), "MON-2025-1000");
        assert_eq!(
            next_in_sequence("MON-2025-", ["MON-2025-999", "MON-2025-1000"]),
            "MON-2025-1001"
        );
    }

    #[test]
    fn indicator_prefix_uppercases_category() {
        assert_eq!(indicator_prefix("akademik"), "IND-AKADEMIK-");
        assert_eq!(indicator_prefix("tata kelola"), "IND-TATA_KELOLA-");
        assert_eq!(indicator_prefix("ékonomi"), "IND-_KONOMI-");
    }

    #[test]
    fn sequential_generation_has_no_gaps() {
        let prefix = CodeFamily::Survey.year_prefix(2025);
        let mut issued: Vec<String> = Vec::new();
        for expected in 1..=12u32 {
            let code = next_in_sequence(&prefix, issued.iter().map(String::as_str));
            assert_eq!(code, format!("SURV-2025-{expected:03}"));
            issued.push(code);
        }
    }
}
