use crate::{
    error::Result,
    storage::models::{Role, Student},
};

/// Read side of the student population.
#[cfg_attr(test, mockall::automock)]
pub trait StudentDirectory {
    /// All students of one graduating batch, in a stable order.
    fn fetch_students_by_batch(&self, batch: i32) -> Result<Vec<Student>>;
}

/// Role lookup and eligibility write-back.
#[cfg_attr(test, mockall::automock)]
pub trait RoleRegistry {
    /// Fails with `NotFound` when the company/role pair does not exist.
    fn fetch_role(&self, company_id: &str, role_id: &str) -> Result<Role>;

    /// Replaces the role's eligibles and clears its applications as one unit.
    fn write_role_eligibility(&self, company_id: &str, role_id: &str, eligibles: &[String]) -> Result<()>;
}
