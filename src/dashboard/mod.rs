//! The dashboard view model: sections, a section's roster, and which
//! students have already been clicked.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};

use crate::api::{Api, ApiError};
use crate::models::{ActivityLog, Section, Student};
use crate::routes::Route;
use crate::store::SessionStore;

/// The keyword the section menu uses for "no filter".
pub const ALL_SECTIONS: &str = "ALL SECTIONS";

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("No section with id '{0}'")]
    UnknownSection(String),
    #[error("No student '{student}' in section '{section}'")]
    UnknownStudent { section: String, student: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A roster line: the student and when they were first clicked, if ever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry<'a> {
    pub student: &'a Student,
    pub clicked_at: Option<DateTime<Utc>>,
}

pub struct Dashboard {
    api: Api,
    sections: Vec<Section>,
    clicked: HashMap<String, DateTime<Utc>>,
}

/// `usernameId -> timestamp`; when a student has several logs the last one
/// wins. Logs without a usable timestamp do not count as clicks.
pub fn clicked_map(logs: &[ActivityLog]) -> HashMap<String, DateTime<Utc>> {
    logs.iter()
        .filter_map(|log| Some((log.username_id.clone(), log.timestamp?)))
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl Dashboard {
    /// Needs both tokens. Without them the view is left for the login view.
    pub async fn load(api: Api) -> Result<Self, DashboardError> {
        if !api.client().store().has_session().await {
            api.client().navigator().navigate(Route::Login);
            return Err(DashboardError::NotAuthenticated);
        }

        let (sections, logs) = tokio::join!(api.list_sections(), api.list_activity_logs());
        let sections = sections?;
        let clicked = match logs {
            Ok(logs) => clicked_map(&logs),
            Err(e) => {
                error!(error = %e, "Error fetching activity logs; showing no clicks");
                HashMap::new()
            }
        };

        info!(
            sections = sections.len(),
            clicked = clicked.len(),
            "Dashboard loaded"
        );
        Ok(Self {
            api,
            sections,
            clicked,
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Case-insensitive substring match on the section name.
    pub fn filter_sections(&self, keyword: &str) -> Vec<&Section> {
        let keyword = keyword.trim();
        if keyword.is_empty() || keyword == ALL_SECTIONS {
            return self.sections.iter().collect();
        }
        self.sections
            .iter()
            .filter(|s| contains_ignore_case(&s.section_name, keyword))
            .collect()
    }

    /// A section's students, narrowed by a case-insensitive name search.
    pub fn students(&self, section_id: &str, search: &str) -> Result<Vec<RosterEntry<'_>>, DashboardError> {
        let section = self
            .section(section_id)
            .ok_or_else(|| DashboardError::UnknownSection(section_id.to_string()))?;
        let search = search.trim();

        Ok(section
            .usernames
            .iter()
            .filter(|student| search.is_empty() || contains_ignore_case(&student.name, search))
            .map(|student| RosterEntry {
                student,
                clicked_at: self.clicked_at(&student.id),
            })
            .collect())
    }

    pub fn clicked_at(&self, student_id: &str) -> Option<DateTime<Utc>> {
        self.clicked.get(student_id).copied()
    }

    /// Log the first click on a student. Later clicks change nothing and
    /// return the original timestamp.
    pub async fn click_student(
        &mut self,
        section_id: &str,
        student_id: &str,
    ) -> Result<DateTime<Utc>, DashboardError> {
        let section = self
            .section(section_id)
            .ok_or_else(|| DashboardError::UnknownSection(section_id.to_string()))?;
        let student = section
            .student(student_id)
            .ok_or_else(|| DashboardError::UnknownStudent {
                section: section_id.to_string(),
                student: student_id.to_string(),
            })?;

        if let Some(at) = self.clicked_at(student_id) {
            return Ok(at);
        }

        let activity = format!("Clicked on student: {}", student.name);
        let name = student.name.clone();
        self.api.log_activity(student_id, &activity).await?;

        let now = Utc::now();
        self.clicked.insert(student_id.to_string(), now);
        info!(student_id, "{} clicked and logged.", name);
        Ok(now)
    }

    pub async fn logout(self) {
        self.api.logout().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn log(id: &str, secs: i64) -> ActivityLog {
        ActivityLog {
            username_id: id.to_string(),
            activity: String::new(),
            timestamp: Utc.timestamp_opt(secs, 0).single(),
        }
    }

    #[test]
    fn test_clicked_map_ignores_logs_without_timestamp() {
        let undated = |id: &str| ActivityLog {
            timestamp: None,
            ..log(id, 0)
        };
        let map = clicked_map(&[log("s1", 100), undated("s1"), undated("s2")]);

        assert_eq!(map.len(), 1);
        assert_eq!(map["s1"], Utc.timestamp_opt(100, 0).unwrap());
    }

    #[test]
    fn test_clicked_map_last_log_wins() {
        let map = clicked_map(&[log("s1", 100), log("s2", 200), log("s1", 300)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["s1"], Utc.timestamp_opt(300, 0).unwrap());
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Grade 7 - Rizal", "rIZ"));
        assert!(!contains_ignore_case("Grade 7 - Rizal", "Bonifacio"));
    }
}
