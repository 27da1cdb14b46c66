pub mod refresh;

use std::collections::HashSet;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use crate::{
    config::MatchingConfig,
    eligibility::{checks, EligibilityMatcher, EligibilityReport, MatchSummary, RoleRegistry},
    error::{PlacementError, Result},
    storage::{Application, Company, Database, DatabaseStats, Offer, Placement, Role, Student},
};

pub use refresh::{RefreshSummary, Refresher};

/// Admin and student operations around the eligibility matcher.
pub struct Portal {
    db: Database,
    matching: MatchingConfig,
}

/// Outcome of marking students placed by email.
#[derive(Debug, Default, Serialize)]
pub struct PlacementSummary {
    pub placed: Vec<String>,
    pub unknown_emails: Vec<String>,
}

impl Portal {
    pub fn new(db: Database, matching: MatchingConfig) -> Self {
        Self { db, matching }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn matcher(&self) -> EligibilityMatcher<'_> {
        EligibilityMatcher::new(&self.db, &self.db, self.matching.clone())
    }

    pub fn import_students(&self, students: &[Student]) -> Result<usize> {
        let mut seen = HashSet::new();
        for student in students {
            validate_student(student)?;
            if !seen.insert(student.id.as_str()) {
                return Err(PlacementError::Validation(format!(
                    "student {} appears more than once",
                    student.id
                )));
            }
        }

        let count = self.db.import_students(students)?;
        info!("Imported {} students", count);
        Ok(count)
    }

    /// Stores a new company and computes eligibility for all its roles.
    /// If matching fails the company is removed again, so the registration
    /// can be retried as-is.
    pub fn register_company(&self, company: &Company) -> Result<MatchSummary> {
        self.validate_company(company)?;
        self.db.insert_company(company)?;

        match self
            .matcher()
            .compute_eligibility(&company.id, &company.roles, company.batch)
        {
            Ok(summary) => {
                info!("Registered company {} with {} roles", company.id, company.roles.len());
                Ok(summary)
            }
            Err(e) => {
                warn!("Eligibility failed for new company {}: {}", company.id, e);
                if let Err(cleanup) = self.db.delete_company(&company.id) {
                    warn!("Could not roll back company {}: {}", company.id, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Replaces the company's details and roles, then recomputes every role.
    /// Applications of all roles are reset as part of the recompute.
    pub fn update_company(&self, company: &Company) -> Result<MatchSummary> {
        self.validate_company(company)?;
        self.db.replace_company(company)?;
        info!("Updated company {}", company.id);

        self.matcher()
            .compute_eligibility(&company.id, &company.roles, company.batch)
    }

    /// Re-runs matching for a stored company, e.g. after student records changed.
    pub fn recompute(&self, company_id: &str) -> Result<MatchSummary> {
        let company = self.db.get_company(company_id)?;
        self.matcher()
            .compute_eligibility(&company.id, &company.roles, company.batch)
    }

    /// Snapshot check; a missing company or role reads as "not eligible".
    pub fn can_apply(&self, company_id: &str, role_id: &str, student_id: &str) -> Result<bool> {
        match self.matcher().is_eligible(company_id, role_id, student_id) {
            Ok(eligible) => Ok(eligible),
            Err(e) if e.is_not_found() => {
                warn!("Eligibility check against unknown role {}/{}: {}", company_id, role_id, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn explain(&self, company_id: &str, role_id: &str, student_id: &str) -> Result<EligibilityReport> {
        let student = self.require_student(student_id)?;
        self.matcher().explain(company_id, role_id, &student)
    }

    pub fn apply(&self, company_id: &str, role_id: &str, student_id: &str) -> Result<Application> {
        self.require_student(student_id)?;

        if !self.can_apply(company_id, role_id, student_id)? {
            return Err(PlacementError::NotEligible(format!(
                "student {} for {}/{}",
                student_id, company_id, role_id
            )));
        }

        let application = Application::new(student_id);
        self.db.add_application(company_id, role_id, &application)?;
        info!("Student {} applied to {}/{}", student_id, company_id, role_id);
        Ok(application)
    }

    /// Current eligibles, applications and placements of one role.
    pub fn role_status(&self, company_id: &str, role_id: &str) -> Result<Role> {
        self.db.fetch_role(company_id, role_id)
    }

    pub fn offers(&self, student_id: &str) -> Result<Vec<Offer>> {
        self.require_student(student_id)?;
        self.db.get_offers_for_student(student_id)
    }

    /// Marks the students behind `emails` as selected for the role.
    /// Unknown emails are reported back instead of failing the batch.
    pub fn mark_placed(&self, company_id: &str, role_id: &str, emails: &[String]) -> Result<PlacementSummary> {
        self.db.fetch_role(company_id, role_id)?;

        let mut summary = PlacementSummary::default();
        for email in emails {
            let Some(student) = self.db.get_student_by_email(email.trim())? else {
                warn!("No student with email {}", email);
                summary.unknown_emails.push(email.clone());
                continue;
            };

            self.db.record_placement(&Placement {
                company_id: company_id.to_string(),
                role_id: role_id.to_string(),
                student_id: student.id.clone(),
                placed_at: Utc::now(),
            })?;
            summary.placed.push(student.id);
        }

        if !summary.placed.is_empty() {
            info!(
                "Marked {} students placed for {}/{}; existing eligibility snapshots are now stale",
                summary.placed.len(),
                company_id,
                role_id
            );
        }
        Ok(summary)
    }

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        self.db.list_companies()
    }

    pub fn delete_company(&self, company_id: &str) -> Result<()> {
        self.db.delete_company(company_id)?;
        info!("Deleted company {}", company_id);
        Ok(())
    }

    pub fn delete_student(&self, student_id: &str) -> Result<()> {
        self.db.delete_student(student_id)?;
        info!("Deleted student {}", student_id);
        Ok(())
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.get_stats()
    }

    fn require_student(&self, student_id: &str) -> Result<Student> {
        self.db
            .get_student(student_id)?
            .ok_or_else(|| PlacementError::NotFound(format!("student {}", student_id)))
    }

    fn validate_company(&self, company: &Company) -> Result<()> {
        if company.id.trim().is_empty() || company.name.trim().is_empty() {
            return Err(PlacementError::Validation("company id and name are required".into()));
        }

        let mut role_ids = HashSet::new();
        for role in &company.roles {
            if role.id.trim().is_empty() {
                return Err(PlacementError::Validation(format!(
                    "company {} has a role without an id",
                    company.id
                )));
            }
            if !role_ids.insert(role.id.as_str()) {
                return Err(PlacementError::Validation(format!(
                    "company {} lists role {} twice",
                    company.id, role.id
                )));
            }
            checks::validate_requirements(&role.id, &role.requirements, self.matching.max_cpi)?;
        }
        Ok(())
    }
}

fn validate_student(student: &Student) -> Result<()> {
    if student.id.trim().is_empty() || student.email.trim().is_empty() {
        return Err(PlacementError::Validation("student id and email are required".into()));
    }

    let record = &student.result;
    let scores = [
        Some(record.cpi),
        Some(record.tenth_perc),
        record.twelfth_perc,
        record.diploma_perc,
    ];
    if scores.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(PlacementError::Validation(format!(
            "student {} has a negative or non-numeric score",
            student.id
        )));
    }
    Ok(())
}
