use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Column headers of the application ledger, in storage order.
pub const LEDGER_HEADERS: [&str; 6] = ["#", "Company", "Role", "Job ID", "Link", "Accepted/Rejected"];

/// Review outcome of an application. An unset status is `None` on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(alias = "accepted")]
    Accepted,
    #[serde(alias = "rejected")]
    Rejected,
}

impl ApplicationStatus {
    /// Marker written to the status column.
    pub fn marker(self) -> &'static str {
        match self {
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// An application waiting to be appended; the ledger assigns `seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub company: String,
    pub role: String,
    pub job_id: Option<String>,
    pub link: Option<String>,
}

impl NewApplication {
    /// Builds a record from generation output. A blank link is stored as `None`.
    pub fn new(company: &str, role: &str, job_id: Option<&str>, link: Option<&str>) -> Self {
        Self {
            company: company.to_string(),
            role: role.to_string(),
            job_id: job_id.map(str::to_string),
            link: link
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationRecord {
    pub seq: u32,
    pub company: String,
    pub role: String,
    pub job_id: Option<String>,
    pub link: Option<String>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationRecord {
    /// Selector text used by the review workflow, e.g. `2. Globex - Analyst`.
    pub fn label(&self) -> String {
        format!("{}. {} - {}", self.seq, self.company, self.role)
    }
}

/// Raw row as stored in the `applications` table.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub seq: i64,
    pub company: String,
    pub role: String,
    pub job_id: Option<String>,
    pub link: Option<String>,
    pub status: Option<String>,
}

impl From<ApplicationRow> for ApplicationRecord {
    fn from(row: ApplicationRow) -> Self {
        Self {
            seq: u32::try_from(row.seq).unwrap_or_default(),
            company: row.company,
            role: row.role,
            job_id: row.job_id,
            link: row.link,
            // Unknown markers written by hand are treated as unset.
            status: row.status.as_deref().and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("ACCEPTED".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Accepted));
        assert_eq!(" rejected ".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Rejected));
        assert!("pending".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_status_serde_accepts_lowercase() {
        let status: ApplicationStatus = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(status, ApplicationStatus::Accepted);
        assert_eq!(serde_json::to_string(&ApplicationStatus::Rejected).unwrap(), "\"Rejected\"");
    }

    #[test]
    fn test_new_application_drops_blank_link() {
        let app = NewApplication::new("Globex", "Analyst", None, Some("   "));
        assert!(app.link.is_none());
        let app = NewApplication::new("Globex", "Analyst", Some("R-12"), Some(" http://x "));
        assert_eq!(app.link.as_deref(), Some("http://x"));
        assert_eq!(app.job_id.as_deref(), Some("R-12"));
    }

    #[test]
    fn test_row_conversion_and_label() {
        let row = ApplicationRow {
            seq: 2,
            company: "Globex".to_string(),
            role: "Analyst".to_string(),
            job_id: None,
            link: Some("http://x".to_string()),
            status: Some("Accepted".to_string()),
        };
        let record = ApplicationRecord::from(row);
        assert_eq!(record.seq, 2);
        assert_eq!(record.status, Some(ApplicationStatus::Accepted));
        assert_eq!(record.label(), "2. Globex - Analyst");
    }

    #[test]
    fn test_headers_match_storage_layout() {
        assert_eq!(LEDGER_HEADERS[0], "#");
        assert_eq!(LEDGER_HEADERS[5], "Accepted/Rejected");
    }
}
