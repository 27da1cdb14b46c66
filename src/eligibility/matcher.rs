use serde::Serialize;
use tracing::{debug, info};
use crate::{
    config::MatchingConfig,
    eligibility::{
        checks::{self, EligibilityReport},
        registry::{RoleRegistry, StudentDirectory},
    },
    error::Result,
    storage::models::{Role, Student},
};

/// Computes and queries per-role eligibility snapshots.
pub struct EligibilityMatcher<'a> {
    directory: &'a dyn StudentDirectory,
    registry: &'a dyn RoleRegistry,
    config: MatchingConfig,
}

/// Result of one matching run, for display by the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSummary {
    pub batch: i32,
    pub students_scanned: usize,
    pub roles: Vec<RoleOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleOutcome {
    pub role_id: String,
    pub eligibles: Vec<String>,
}

impl MatchSummary {
    pub fn total_eligible(&self) -> usize {
        self.roles.iter().map(|r| r.eligibles.len()).sum()
    }
}

impl<'a> EligibilityMatcher<'a> {
    pub fn new(
        directory: &'a dyn StudentDirectory,
        registry: &'a dyn RoleRegistry,
        config: MatchingConfig,
    ) -> Self {
        Self { directory, registry, config }
    }

    /// Recompute the eligibles of every role in `roles` against `batch`.
    ///
    /// All roles are validated before anything is read. Students are
    /// fetched once and the same snapshot is used for every role. Each
    /// role is written on its own; if a write fails the roles before it
    /// keep their new eligibles and the error is returned as is.
    pub fn compute_eligibility(&self, company_id: &str, roles: &[Role], batch: i32) -> Result<MatchSummary> {
        if roles.is_empty() {
            debug!("No roles to match for company {}", company_id);
            return Ok(MatchSummary { batch, ..MatchSummary::default() });
        }

        for role in roles {
            checks::validate_requirements(&role.id, &role.requirements, self.config.max_cpi)?;
        }

        let students = self.directory.fetch_students_by_batch(batch)?;
        info!(
            "Matching {} roles of company {} against {} students of batch {}",
            roles.len(),
            company_id,
            students.len(),
            batch
        );

        let mut summary = MatchSummary {
            batch,
            students_scanned: students.len(),
            roles: Vec::with_capacity(roles.len()),
        };

        for role in roles {
            let eligibles = eligible_ids(role, &students);
            self.registry.write_role_eligibility(company_id, &role.id, &eligibles)?;

            info!("Role {}/{}: {} eligible", company_id, role.id, eligibles.len());
            summary.roles.push(RoleOutcome {
                role_id: role.id.clone(),
                eligibles,
            });
        }

        Ok(summary)
    }

    /// Point query against the stored snapshot; does not re-derive anything.
    pub fn is_eligible(&self, company_id: &str, role_id: &str, student_id: &str) -> Result<bool> {
        let role = self.registry.fetch_role(company_id, role_id)?;
        Ok(role.eligibles.iter().any(|id| id == student_id))
    }

    /// Per-clause breakdown of the student against the role's current requirements.
    pub fn explain(&self, company_id: &str, role_id: &str, student: &Student) -> Result<EligibilityReport> {
        let role = self.registry.fetch_role(company_id, role_id)?;
        Ok(checks::explain(&role.requirements, student))
    }
}

/// Ids of the students meeting `role`, in the order they were fetched.
fn eligible_ids(role: &Role, students: &[Student]) -> Vec<String> {
    let mut eligibles = Vec::new();
    for student in students {
        match checks::first_failure(&role.requirements, student) {
            None => eligibles.push(student.id.clone()),
            Some((clause, _)) => debug!("Student {} fails {} for role {}", student.id, clause, role.id),
        }
    }
    eligibles
}
