use colored::Colorize;
use indicatif::ProgressBar;
use tracing::{info, warn};
use crate::{
    error::{PlacementError, Result},
    portal::Portal,
};

/// Recomputes the eligibility snapshots of every stored company.
pub struct Refresher<'a> {
    portal: &'a Portal,
}

impl<'a> Refresher<'a> {
    pub fn new(portal: &'a Portal) -> Self {
        Self { portal }
    }

    /// One pass over all companies. A failing company is recorded and the
    /// pass moves on; the next pass retries it.
    pub fn refresh_all(&self, progress: &ProgressBar) -> Result<RefreshSummary> {
        let companies = self.portal.list_companies()?;
        info!("Refreshing eligibility for {} companies", companies.len());

        progress.set_length(companies.len() as u64);
        let mut summary = RefreshSummary {
            companies: companies.len(),
            ..RefreshSummary::default()
        };

        for company in &companies {
            progress.set_message(company.id.clone());
            match self
                .portal
                .matcher()
                .compute_eligibility(&company.id, &company.roles, company.batch)
            {
                Ok(result) => {
                    summary.refreshed += 1;
                    summary.roles += result.roles.len();
                    summary.total_eligible += result.total_eligible();
                }
                Err(e) => {
                    warn!("Failed to refresh company {}: {}", company.id, e);
                    summary.failed += 1;
                    summary.failures.push((company.id.clone(), e));
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "Refresh complete: {} refreshed, {} failed, {} eligible pairs",
            summary.refreshed, summary.failed, summary.total_eligible
        );
        Ok(summary)
    }
}

#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub companies: usize,
    pub refreshed: usize,
    pub failed: usize,
    pub roles: usize,
    pub total_eligible: usize,
    pub failures: Vec<(String, PlacementError)>,
}

impl RefreshSummary {
    pub fn print_summary(&self) {
        println!("\n{}", "=== Eligibility Refresh Summary ===".cyan().bold());
        println!("Companies:       {}", self.companies);
        println!("Refreshed:       {} ✓", self.refreshed.to_string().green());
        println!("Failed:          {} ✗", self.failed.to_string().red());
        println!("Roles matched:   {}", self.roles);
        println!("Eligible pairs:  {}", self.total_eligible);
        for (company_id, error) in &self.failures {
            println!("  {} {}", company_id.yellow(), error);
        }
        println!("{}", "===================================".cyan());
    }

    pub fn success_rate(&self) -> f64 {
        if self.companies == 0 {
            0.0
        } else {
            (self.refreshed as f64 / self.companies as f64) * 100.0
        }
    }

    pub fn has_transient_failures(&self) -> bool {
        self.failures.iter().any(|(_, e)| e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MatchingConfig,
        storage::{AcademicRecord, Company, Database, Requirements, Role, SelectionStatus, Student},
    };

    fn student(id: &str, batch: i32) -> Student {
        Student {
            id: id.into(),
            name: id.into(),
            email: format!("{}@campus.edu", id.to_lowercase()),
            batch,
            selection_status: SelectionStatus::NotSelected,
            result: AcademicRecord {
                cpi: 8.0,
                tenth_perc: 70.0,
                twelfth_perc: None,
                diploma_perc: Some(78.0),
            },
            competitive_coding: Vec::new(),
        }
    }

    fn company(id: &str, batch: i32) -> Company {
        Company {
            id: id.into(),
            name: id.into(),
            batch,
            roles: vec![Role {
                id: "intern".into(),
                title: "Intern".into(),
                ctc: None,
                requirements: Requirements {
                    diploma_perc: Some(75.0),
                    ..Requirements::default()
                },
                eligibles: Vec::new(),
                applications: Vec::new(),
                placed: Vec::new(),
            }],
        }
    }

    #[test]
    fn refresh_picks_up_students_added_after_registration() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("refresh.db").to_str().unwrap()).unwrap();
        let portal = Portal::new(db, MatchingConfig { max_cpi: 10.0, refresh_interval_secs: 60 });

        portal.register_company(&company("acme", 2024)).unwrap();
        portal.register_company(&company("globex", 2025)).unwrap();
        portal
            .import_students(&[student("S1", 2024), student("S2", 2025), student("S3", 2025)])
            .unwrap();
        assert!(!portal.can_apply("acme", "intern", "S1").unwrap());

        let summary = Refresher::new(&portal).refresh_all(&ProgressBar::hidden()).unwrap();
        assert_eq!(summary.companies, 2);
        assert_eq!(summary.refreshed, 2);
        assert_eq!(summary.total_eligible, 3);
        assert_eq!(summary.success_rate(), 100.0);
        assert!(!summary.has_transient_failures());
        assert!(portal.can_apply("acme", "intern", "S1").unwrap());
        assert!(!portal.can_apply("acme", "intern", "S2").unwrap());
    }

    #[test]
    fn empty_store_refreshes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("empty.db").to_str().unwrap()).unwrap();
        let portal = Portal::new(db, MatchingConfig { max_cpi: 10.0, refresh_interval_secs: 60 });

        let summary = Refresher::new(&portal).refresh_all(&ProgressBar::hidden()).unwrap();
        assert_eq!(summary.companies, 0);
        assert_eq!(summary.success_rate(), 0.0);
    }
}
