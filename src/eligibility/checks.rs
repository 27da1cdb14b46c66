use serde::Serialize;
use crate::{
    error::{PlacementError, Result},
    storage::models::{CodingProfileEntry, CodingRequirement, Requirements, SelectionStatus, Student},
};

/// Outcome of a single requirement clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ClauseDecision {
    Pass,
    Fail { reason: String },
}

impl ClauseDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, ClauseDecision::Pass)
    }
}

type Clause = (&'static str, fn(&Requirements, &Student) -> ClauseDecision);

/// Evaluated in order; the first failure decides ineligibility.
const CLAUSES: [Clause; 5] = [
    ("selection", check_selection),
    ("cpi", check_cpi),
    ("twelfth_or_diploma", check_twelfth_or_diploma),
    ("tenth", check_tenth),
    ("competitive_coding", check_competitive_coding),
];

/// Per-clause breakdown for one (student, role) pair.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityReport {
    pub student_id: String,
    pub is_eligible: bool,
    pub decisions: Vec<(&'static str, ClauseDecision)>,
}

impl EligibilityReport {
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.decisions.iter().filter_map(|(name, d)| match d {
            ClauseDecision::Fail { reason } => Some((*name, reason.as_str())),
            ClauseDecision::Pass => None,
        })
    }
}

/// Name and decision of the first clause the student fails, if any.
pub fn first_failure(requirements: &Requirements, student: &Student) -> Option<(&'static str, ClauseDecision)> {
    CLAUSES.iter().find_map(|(name, check)| {
        let decision = check(requirements, student);
        (!decision.is_pass()).then_some((*name, decision))
    })
}

pub fn is_student_eligible(requirements: &Requirements, student: &Student) -> bool {
    first_failure(requirements, student).is_none()
}

/// Runs every clause, without short-circuiting.
pub fn explain(requirements: &Requirements, student: &Student) -> EligibilityReport {
    let decisions: Vec<_> = CLAUSES
        .iter()
        .map(|(name, check)| (*name, check(requirements, student)))
        .collect();

    EligibilityReport {
        student_id: student.id.clone(),
        is_eligible: decisions.iter().all(|(_, d)| d.is_pass()),
        decisions,
    }
}

fn check_selection(_requirements: &Requirements, student: &Student) -> ClauseDecision {
    match student.selection_status {
        SelectionStatus::NotSelected => ClauseDecision::Pass,
        SelectionStatus::Selected => ClauseDecision::Fail {
            reason: "already selected".into(),
        },
    }
}

fn check_cpi(requirements: &Requirements, student: &Student) -> ClauseDecision {
    let required = requirements.min_cpi();
    if student.result.cpi >= required {
        ClauseDecision::Pass
    } else {
        ClauseDecision::Fail {
            reason: format!("cpi {} < required {}", student.result.cpi, required),
        }
    }
}

/// Either track qualifies. A track at 0 counts as not taken, so a student
/// with both at 0 never passes, whatever the thresholds.
fn check_twelfth_or_diploma(requirements: &Requirements, student: &Student) -> ClauseDecision {
    let twelfth = student.result.twelfth();
    let diploma = student.result.diploma();

    let twelfth_ok = twelfth != 0.0 && twelfth >= requirements.min_twelfth();
    let diploma_ok = diploma != 0.0 && diploma >= requirements.min_diploma();

    if twelfth_ok || diploma_ok {
        return ClauseDecision::Pass;
    }

    if twelfth == 0.0 && diploma == 0.0 {
        ClauseDecision::Fail {
            reason: "no twelfth or diploma percentage on record".into(),
        }
    } else {
        ClauseDecision::Fail {
            reason: format!(
                "twelfth {} / diploma {} below required {} / {}",
                twelfth,
                diploma,
                requirements.min_twelfth(),
                requirements.min_diploma()
            ),
        }
    }
}

fn check_tenth(requirements: &Requirements, student: &Student) -> ClauseDecision {
    let required = requirements.min_tenth();
    if student.result.tenth_perc >= required {
        ClauseDecision::Pass
    } else {
        ClauseDecision::Fail {
            reason: format!("tenth {} < required {}", student.result.tenth_perc, required),
        }
    }
}

fn check_competitive_coding(requirements: &Requirements, student: &Student) -> ClauseDecision {
    let unmet: Vec<String> = requirements
        .competitive_coding
        .iter()
        .filter(|req| !student.competitive_coding.iter().any(|entry| satisfies(entry, req)))
        .map(|req| format!("{} (stars >= {}, rating >= {})", req.platform, req.stars, req.rating))
        .collect();

    if unmet.is_empty() {
        ClauseDecision::Pass
    } else {
        ClauseDecision::Fail {
            reason: format!("unmet coding requirements: {}", unmet.join(", ")),
        }
    }
}

fn satisfies(entry: &CodingProfileEntry, requirement: &CodingRequirement) -> bool {
    entry.platform.to_lowercase() == requirement.platform.to_lowercase()
        && entry.stars >= requirement.stars
        && entry.rating >= requirement.rating
}

/// Rejects thresholds no student record could be meaningfully compared against.
pub fn validate_requirements(role_id: &str, requirements: &Requirements, max_cpi: f64) -> Result<()> {
    let invalid = |msg: String| Err(PlacementError::Validation(format!("role {}: {}", role_id, msg)));

    if let Some(cpi) = requirements.cpi {
        if !cpi.is_finite() || cpi < 0.0 || cpi > max_cpi {
            return invalid(format!("cpi threshold {} outside 0..={}", cpi, max_cpi));
        }
    }

    let percentages = [
        ("tenth_perc", requirements.tenth_perc),
        ("twelfth_perc", requirements.twelfth_perc),
        ("diploma_perc", requirements.diploma_perc),
    ];
    for (name, value) in percentages {
        if let Some(value) = value {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return invalid(format!("{} threshold {} outside 0..=100", name, value));
            }
        }
    }

    for req in &requirements.competitive_coding {
        if req.platform.trim().is_empty() {
            return invalid("coding requirement with empty platform".into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::AcademicRecord;

    fn codeforces(stars: u32, rating: u32) -> CodingProfileEntry {
        CodingProfileEntry { platform: "Codeforces".into(), stars, rating }
    }

    fn base_requirements() -> Requirements {
        Requirements {
            cpi: Some(7.0),
            tenth_perc: Some(60.0),
            twelfth_perc: Some(60.0),
            diploma_perc: Some(0.0),
            competitive_coding: vec![CodingRequirement {
                platform: "Codeforces".into(),
                stars: 2,
                rating: 1200,
            }],
        }
    }

    fn student_a() -> Student {
        Student {
            id: "A".into(),
            name: "Student A".into(),
            email: "a@campus.edu".into(),
            batch: 2024,
            selection_status: SelectionStatus::NotSelected,
            result: AcademicRecord {
                cpi: 7.5,
                tenth_perc: 65.0,
                twelfth_perc: Some(70.0),
                diploma_perc: Some(0.0),
            },
            competitive_coding: vec![codeforces(3, 1300)],
        }
    }

    #[test]
    fn example_scenario() {
        let req = base_requirements();
        assert!(is_student_eligible(&req, &student_a()));

        let mut b = student_a();
        b.selection_status = SelectionStatus::Selected;
        assert!(!is_student_eligible(&req, &b));

        let mut c = student_a();
        c.result.cpi = 6.9;
        let failure = first_failure(&req, &c);
        assert!(matches!(failure, Some(("cpi", ClauseDecision::Fail { .. }))));
    }

    #[test]
    fn selected_student_never_qualifies() {
        let mut student = student_a();
        student.selection_status = SelectionStatus::Selected;
        student.result.cpi = 10.0;
        assert!(!is_student_eligible(&Requirements::default(), &student));
    }

    #[test]
    fn diploma_track_substitutes_for_twelfth() {
        let req = Requirements {
            twelfth_perc: Some(90.0),
            diploma_perc: Some(80.0),
            ..Requirements::default()
        };
        let mut student = student_a();
        student.result.twelfth_perc = Some(0.0);
        student.result.diploma_perc = Some(85.0);
        assert!(is_student_eligible(&req, &student));
    }

    #[test]
    fn both_tracks_zero_never_qualify() {
        let mut student = student_a();
        student.result.twelfth_perc = None;
        student.result.diploma_perc = Some(0.0);

        let strict = Requirements { twelfth_perc: Some(50.0), ..Requirements::default() };
        assert!(!is_student_eligible(&strict, &student));
        // Zero thresholds still need a track on record.
        assert!(!is_student_eligible(&Requirements::default(), &student));
    }

    #[test]
    fn every_coding_requirement_must_be_met() {
        let req = Requirements {
            competitive_coding: vec![
                CodingRequirement { platform: "Codeforces".into(), stars: 3, rating: 1400 },
                CodingRequirement { platform: "LeetCode".into(), stars: 2, rating: 1600 },
            ],
            ..Requirements::default()
        };

        let mut student = student_a();
        student.competitive_coding = vec![codeforces(3, 1500)];
        let report = explain(&req, &student);
        assert!(!report.is_eligible);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("LeetCode"));

        student.competitive_coding.push(CodingProfileEntry {
            platform: "LeetCode".into(),
            stars: 2,
            rating: 1650,
        });
        assert!(is_student_eligible(&req, &student));
    }

    #[test]
    fn platform_match_ignores_case() {
        let mut student = student_a();
        student.competitive_coding = vec![CodingProfileEntry {
            platform: "CODEFORCES".into(),
            stars: 2,
            rating: 1200,
        }];
        assert!(is_student_eligible(&base_requirements(), &student));
    }

    #[test]
    fn one_entry_may_satisfy_several_clauses() {
        let req = Requirements {
            competitive_coding: vec![
                CodingRequirement { platform: "codeforces".into(), stars: 1, rating: 1000 },
                CodingRequirement { platform: "Codeforces".into(), stars: 3, rating: 1300 },
            ],
            ..Requirements::default()
        };
        assert!(is_student_eligible(&req, &student_a()));
    }

    #[test]
    fn lowering_a_threshold_never_excludes() {
        let student = student_a();
        let mut req = base_requirements();
        req.cpi = Some(7.5);
        assert!(is_student_eligible(&req, &student));
        req.cpi = Some(7.0);
        assert!(is_student_eligible(&req, &student));
        req.cpi = Some(7.6);
        assert!(!is_student_eligible(&req, &student));

        let mut req = base_requirements();
        req.competitive_coding[0].rating = 1301;
        assert!(!is_student_eligible(&req, &student));
        req.competitive_coding[0].rating = 1300;
        assert!(is_student_eligible(&req, &student));
    }

    #[test]
    fn percentage_thresholds_are_monotonic() {
        let student = student_a();
        let mut req = base_requirements();
        req.tenth_perc = Some(66.0);
        assert!(!is_student_eligible(&req, &student));
        req.tenth_perc = Some(65.0);
        assert!(is_student_eligible(&req, &student));

        let mut req = base_requirements();
        req.twelfth_perc = Some(71.0);
        assert!(!is_student_eligible(&req, &student));
        req.twelfth_perc = Some(70.0);
        assert!(is_student_eligible(&req, &student));

        let mut diploma_holder = student_a();
        diploma_holder.result.twelfth_perc = None;
        diploma_holder.result.diploma_perc = Some(85.0);
        let mut req = base_requirements();
        req.diploma_perc = Some(86.0);
        assert!(!is_student_eligible(&req, &diploma_holder));
        req.diploma_perc = Some(85.0);
        assert!(is_student_eligible(&req, &diploma_holder));
        req.diploma_perc = None;
        assert!(is_student_eligible(&req, &diploma_holder));
    }

    #[test]
    fn explain_reports_every_failing_clause() {
        let mut student = student_a();
        student.result.cpi = 5.0;
        student.result.tenth_perc = 40.0;
        let report = explain(&base_requirements(), &student);
        let names: Vec<_> = report.failures().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["cpi", "tenth"]);
    }

    #[test]
    fn validation_rejects_out_of_range_thresholds() {
        let mut req = base_requirements();
        req.cpi = Some(-1.0);
        assert!(matches!(
            validate_requirements("sde", &req, 10.0),
            Err(PlacementError::Validation(_))
        ));

        let mut req = base_requirements();
        req.tenth_perc = Some(101.0);
        assert!(validate_requirements("sde", &req, 10.0).is_err());

        let mut req = base_requirements();
        req.diploma_perc = Some(f64::NAN);
        assert!(validate_requirements("sde", &req, 10.0).is_err());

        let mut req = base_requirements();
        req.competitive_coding[0].platform = "  ".into();
        assert!(validate_requirements("sde", &req, 10.0).is_err());

        assert!(validate_requirements("sde", &base_requirements(), 10.0).is_ok());
        assert!(validate_requirements("sde", &Requirements::default(), 10.0).is_ok());
    }
}
