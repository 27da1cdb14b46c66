use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// A student as held by the directory; the matcher only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Graduating batch (passing year).
    pub batch: i32,
    #[serde(default)]
    pub selection_status: SelectionStatus,
    pub result: AcademicRecord,
    #[serde(default)]
    pub competitive_coding: Vec<CodingProfileEntry>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    #[default]
    NotSelected,
    Selected,
}

impl std::fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionStatus::NotSelected => write!(f, "not_selected"),
            SelectionStatus::Selected => write!(f, "selected"),
        }
    }
}

impl std::str::FromStr for SelectionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "not_selected" => Ok(SelectionStatus::NotSelected),
            "selected" => Ok(SelectionStatus::Selected),
            other => Err(format!("unknown selection status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AcademicRecord {
    pub cpi: f64,
    pub tenth_perc: f64,
    #[serde(default)]
    pub twelfth_perc: Option<f64>,
    #[serde(default)]
    pub diploma_perc: Option<f64>,
}

impl AcademicRecord {
    /// Absent twelfth percentage reads as 0, i.e. "track not taken".
    pub fn twelfth(&self) -> f64 {
        self.twelfth_perc.unwrap_or(0.0)
    }

    /// Absent diploma percentage reads as 0, i.e. "track not taken".
    pub fn diploma(&self) -> f64 {
        self.diploma_perc.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodingProfileEntry {
    pub platform: String,
    pub stars: u32,
    #[serde(alias = "ratings")]
    pub rating: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Graduating batch all of this company's roles are matched against.
    pub batch: i32,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ctc: Option<f64>,
    #[serde(default)]
    pub requirements: Requirements,
    /// Snapshot from the last matching run, in student fetch order.
    #[serde(default)]
    pub eligibles: Vec<String>,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub placed: Vec<String>,
}

/// Role thresholds. A missing academic threshold means 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Requirements {
    #[serde(default)]
    pub cpi: Option<f64>,
    #[serde(default)]
    pub tenth_perc: Option<f64>,
    #[serde(default)]
    pub twelfth_perc: Option<f64>,
    #[serde(default)]
    pub diploma_perc: Option<f64>,
    #[serde(default)]
    pub competitive_coding: Vec<CodingRequirement>,
}

impl Requirements {
    pub fn min_cpi(&self) -> f64 {
        self.cpi.unwrap_or(0.0)
    }

    pub fn min_tenth(&self) -> f64 {
        self.tenth_perc.unwrap_or(0.0)
    }

    pub fn min_twelfth(&self) -> f64 {
        self.twelfth_perc.unwrap_or(0.0)
    }

    pub fn min_diploma(&self) -> f64 {
        self.diploma_perc.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodingRequirement {
    pub platform: String,
    #[serde(default)]
    pub stars: u32,
    #[serde(default, alias = "ratings")]
    pub rating: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub student_id: String,
    pub applied_at: DateTime<Utc>,
}

impl Application {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            applied_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Placement {
    pub company_id: String,
    pub role_id: String,
    pub student_id: String,
    pub placed_at: DateTime<Utc>,
}
