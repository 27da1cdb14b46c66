use std::{collections::HashMap, time::Duration};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;
use crate::{
    config::DatabaseConfig,
    eligibility::registry::{RoleRegistry, StudentDirectory},
    error::{PlacementError, Result},
    storage::models::{
        AcademicRecord, Application, CodingProfileEntry, CodingRequirement, Company, Placement,
        Requirements, Role, SelectionStatus, Student,
    },
};

const STUDENT_COLUMNS: &str =
    "id, name, email, batch, selection_status, cpi, tenth_perc, twelfth_perc, diploma_perc";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let db = Self::new(&config.path)?;
        db.conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS students (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                batch INTEGER NOT NULL,
                selection_status TEXT NOT NULL,
                cpi REAL NOT NULL,
                tenth_perc REAL NOT NULL,
                twelfth_perc REAL,
                diploma_perc REAL
            );

            CREATE INDEX IF NOT EXISTS idx_students_batch ON students(batch);

            CREATE TABLE IF NOT EXISTS coding_profiles (
                student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                platform TEXT NOT NULL,
                stars INTEGER NOT NULL,
                rating INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS companies (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                batch INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS roles (
                company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                id TEXT NOT NULL,
                title TEXT NOT NULL,
                ctc REAL,
                req_cpi REAL,
                req_tenth_perc REAL,
                req_twelfth_perc REAL,
                req_diploma_perc REAL,
                PRIMARY KEY (company_id, id)
            );

            CREATE TABLE IF NOT EXISTS role_coding_requirements (
                company_id TEXT NOT NULL,
                role_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                stars INTEGER NOT NULL,
                rating INTEGER NOT NULL,
                FOREIGN KEY (company_id, role_id) REFERENCES roles(company_id, id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS role_eligibles (
                company_id TEXT NOT NULL,
                role_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                student_id TEXT NOT NULL,
                PRIMARY KEY (company_id, role_id, position),
                FOREIGN KEY (company_id, role_id) REFERENCES roles(company_id, id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_eligibles_student ON role_eligibles(student_id);

            CREATE TABLE IF NOT EXISTS applications (
                company_id TEXT NOT NULL,
                role_id TEXT NOT NULL,
                student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                applied_at TEXT NOT NULL,
                PRIMARY KEY (company_id, role_id, student_id),
                FOREIGN KEY (company_id, role_id) REFERENCES roles(company_id, id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS placements (
                company_id TEXT NOT NULL,
                role_id TEXT NOT NULL,
                student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                placed_at TEXT NOT NULL,
                PRIMARY KEY (company_id, role_id, student_id),
                FOREIGN KEY (company_id, role_id) REFERENCES roles(company_id, id) ON DELETE CASCADE
            );",
        )?;

        Ok(())
    }

    // Students

    /// Inserts or updates each student and replaces its coding profile.
    pub fn import_students(&self, students: &[Student]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for student in students {
            upsert_student(&tx, student)?;
        }
        tx.commit()?;
        Ok(students.len())
    }

    pub fn save_student(&self, student: &Student) -> Result<()> {
        self.import_students(std::slice::from_ref(student)).map(|_| ())
    }

    pub fn get_student(&self, id: &str) -> Result<Option<Student>> {
        self.find_student("id", id)
    }

    pub fn get_student_by_email(&self, email: &str) -> Result<Option<Student>> {
        self.find_student("email", email)
    }

    fn find_student(&self, column: &str, value: &str) -> Result<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE {} = ?1", STUDENT_COLUMNS, column);
        let student = self
            .conn
            .query_row(&sql, [value], student_from_row)
            .optional()?;

        let Some(mut student) = student else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT platform, stars, rating FROM coding_profiles
             WHERE student_id = ?1 ORDER BY rowid",
        )?;
        student.competitive_coding = stmt
            .query_map([&student.id], |row| {
                Ok(CodingProfileEntry {
                    platform: row.get(0)?,
                    stars: row.get(1)?,
                    rating: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(student))
    }

    pub fn delete_student(&self, id: &str) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM students WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(PlacementError::NotFound(format!("student {}", id)));
        }
        Ok(())
    }

    // Companies and roles

    pub fn company_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM companies WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Stores a new company with its roles. Eligibles start empty.
    pub fn insert_company(&self, company: &Company) -> Result<()> {
        if self.company_exists(&company.id)? {
            return Err(PlacementError::Validation(format!(
                "company {} is already registered",
                company.id
            )));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO companies (id, name, batch) VALUES (?1, ?2, ?3)",
            params![company.id, company.name, company.batch],
        )?;
        for role in &company.roles {
            upsert_role(&tx, &company.id, role)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Overwrites name, batch and role set. Roles missing from `company`
    /// are removed together with their eligibles and applications.
    pub fn replace_company(&self, company: &Company) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE companies SET name = ?2, batch = ?3 WHERE id = ?1",
            params![company.id, company.name, company.batch],
        )?;
        if updated == 0 {
            return Err(PlacementError::NotFound(format!("company {}", company.id)));
        }

        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM roles WHERE company_id = ?1")?;
            let ids = stmt
                .query_map([&company.id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            ids
        };
        for stale in existing.iter().filter(|id| !company.roles.iter().any(|r| &r.id == *id)) {
            debug!("Removing role {}/{}", company.id, stale);
            tx.execute(
                "DELETE FROM roles WHERE company_id = ?1 AND id = ?2",
                params![company.id, stale],
            )?;
        }

        for role in &company.roles {
            upsert_role(&tx, &company.id, role)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_company(&self, id: &str) -> Result<Company> {
        let company = self
            .conn
            .query_row(
                "SELECT id, name, batch FROM companies WHERE id = ?1",
                [id],
                |row| {
                    Ok(Company {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        batch: row.get(2)?,
                        roles: Vec::new(),
                    })
                },
            )
            .optional()?;

        let mut company = company.ok_or_else(|| PlacementError::NotFound(format!("company {}", id)))?;
        company.roles = self.load_roles(&company.id)?;
        Ok(company)
    }

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let ids: Vec<String> = {
            let mut stmt = self.conn.prepare("SELECT id FROM companies ORDER BY rowid")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            ids
        };

        ids.iter().map(|id| self.get_company(id)).collect()
    }

    pub fn delete_company(&self, id: &str) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM companies WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(PlacementError::NotFound(format!("company {}", id)));
        }
        Ok(())
    }

    fn load_roles(&self, company_id: &str) -> Result<Vec<Role>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, ctc, req_cpi, req_tenth_perc, req_twelfth_perc, req_diploma_perc
             FROM roles WHERE company_id = ?1 ORDER BY rowid",
        )?;
        let mut roles = stmt
            .query_map([company_id], |row| {
                Ok(Role {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    ctc: row.get(2)?,
                    requirements: Requirements {
                        cpi: row.get(3)?,
                        tenth_perc: row.get(4)?,
                        twelfth_perc: row.get(5)?,
                        diploma_perc: row.get(6)?,
                        competitive_coding: Vec::new(),
                    },
                    eligibles: Vec::new(),
                    applications: Vec::new(),
                    placed: Vec::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for role in &mut roles {
            self.fill_role_details(company_id, role)?;
        }
        Ok(roles)
    }

    fn fill_role_details(&self, company_id: &str, role: &mut Role) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT platform, stars, rating FROM role_coding_requirements
             WHERE company_id = ?1 AND role_id = ?2 ORDER BY rowid",
        )?;
        role.requirements.competitive_coding = stmt
            .query_map(params![company_id, role.id], |row| {
                Ok(CodingRequirement {
                    platform: row.get(0)?,
                    stars: row.get(1)?,
                    rating: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT student_id FROM role_eligibles
             WHERE company_id = ?1 AND role_id = ?2 ORDER BY position",
        )?;
        role.eligibles = stmt
            .query_map(params![company_id, role.id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT student_id, applied_at FROM applications
             WHERE company_id = ?1 AND role_id = ?2 ORDER BY applied_at, rowid",
        )?;
        role.applications = stmt
            .query_map(params![company_id, role.id], |row| {
                Ok(Application {
                    student_id: row.get(0)?,
                    applied_at: parse_timestamp(row, 1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT student_id FROM placements
             WHERE company_id = ?1 AND role_id = ?2 ORDER BY placed_at, rowid",
        )?;
        role.placed = stmt
            .query_map(params![company_id, role.id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(())
    }

    // Applications and placements

    pub fn add_application(&self, company_id: &str, role_id: &str, application: &Application) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO applications (company_id, role_id, student_id, applied_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                company_id,
                role_id,
                application.student_id,
                application.applied_at.to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            return Err(PlacementError::AlreadyApplied(format!(
                "student {} for {}/{}",
                application.student_id, company_id, role_id
            )));
        }
        Ok(())
    }

    /// Marks the student selected and records the placement in one transaction.
    pub fn record_placement(&self, placement: &Placement) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE students SET selection_status = ?2 WHERE id = ?1",
            params![placement.student_id, SelectionStatus::Selected.to_string()],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO placements (company_id, role_id, student_id, placed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                placement.company_id,
                placement.role_id,
                placement.student_id,
                placement.placed_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Roles whose current snapshot lists the student.
    pub fn get_offers_for_student(&self, student_id: &str) -> Result<Vec<Offer>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, r.id, r.title, r.ctc,
                    EXISTS (SELECT 1 FROM applications a
                            WHERE a.company_id = e.company_id AND a.role_id = e.role_id
                              AND a.student_id = e.student_id)
             FROM role_eligibles e
             JOIN roles r ON r.company_id = e.company_id AND r.id = e.role_id
             JOIN companies c ON c.id = e.company_id
             WHERE e.student_id = ?1
             ORDER BY c.rowid, r.rowid",
        )?;

        let offers = stmt
            .query_map([student_id], |row| {
                Ok(Offer {
                    company_id: row.get(0)?,
                    company_name: row.get(1)?,
                    role_id: row.get(2)?,
                    role_title: row.get(3)?,
                    ctc: row.get(4)?,
                    applied: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(offers)
    }

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            total_students: count("SELECT COUNT(*) FROM students")?,
            selected_students: count("SELECT COUNT(*) FROM students WHERE selection_status = 'selected'")?,
            companies: count("SELECT COUNT(*) FROM companies")?,
            roles: count("SELECT COUNT(*) FROM roles")?,
            eligible_pairs: count("SELECT COUNT(*) FROM role_eligibles")?,
            applications: count("SELECT COUNT(*) FROM applications")?,
            placements: count("SELECT COUNT(*) FROM placements")?,
        })
    }
}

impl StudentDirectory for Database {
    fn fetch_students_by_batch(&self, batch: i32) -> Result<Vec<Student>> {
        // One read transaction so students and profiles come from the same snapshot.
        let tx = self.conn.unchecked_transaction()?;

        let mut students = {
            let sql = format!(
                "SELECT {} FROM students WHERE batch = ?1 ORDER BY rowid",
                STUDENT_COLUMNS
            );
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt
                .query_map([batch], student_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut profiles: HashMap<String, Vec<CodingProfileEntry>> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "SELECT cp.student_id, cp.platform, cp.stars, cp.rating
                 FROM coding_profiles cp
                 JOIN students s ON s.id = cp.student_id
                 WHERE s.batch = ?1
                 ORDER BY cp.rowid",
            )?;
            let mut rows = stmt.query([batch])?;
            while let Some(row) = rows.next()? {
                let student_id: String = row.get(0)?;
                profiles.entry(student_id).or_default().push(CodingProfileEntry {
                    platform: row.get(1)?,
                    stars: row.get(2)?,
                    rating: row.get(3)?,
                });
            }
        }
        tx.commit()?;

        for student in &mut students {
            if let Some(entries) = profiles.remove(&student.id) {
                student.competitive_coding = entries;
            }
        }

        debug!("Fetched {} students of batch {}", students.len(), batch);
        Ok(students)
    }
}

impl RoleRegistry for Database {
    fn fetch_role(&self, company_id: &str, role_id: &str) -> Result<Role> {
        let company = self.get_company(company_id)?;
        company
            .roles
            .into_iter()
            .find(|role| role.id == role_id)
            .ok_or_else(|| PlacementError::NotFound(format!("role {}/{}", company_id, role_id)))
    }

    fn write_role_eligibility(&self, company_id: &str, role_id: &str, eligibles: &[String]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let found: i64 = tx.query_row(
            "SELECT COUNT(*) FROM roles WHERE company_id = ?1 AND id = ?2",
            params![company_id, role_id],
            |row| row.get(0),
        )?;
        if found == 0 {
            return Err(PlacementError::NotFound(format!("role {}/{}", company_id, role_id)));
        }

        tx.execute(
            "DELETE FROM role_eligibles WHERE company_id = ?1 AND role_id = ?2",
            params![company_id, role_id],
        )?;
        tx.execute(
            "DELETE FROM applications WHERE company_id = ?1 AND role_id = ?2",
            params![company_id, role_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO role_eligibles (company_id, role_id, position, student_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, student_id) in eligibles.iter().enumerate() {
                stmt.execute(params![company_id, role_id, position as i64, student_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

/// A role the student currently appears eligible for.
#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    pub company_id: String,
    pub company_name: String,
    pub role_id: String,
    pub role_title: String,
    pub ctc: Option<f64>,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_students: usize,
    pub selected_students: usize,
    pub companies: usize,
    pub roles: usize,
    pub eligible_pairs: usize,
    pub applications: usize,
    pub placements: usize,
}

fn upsert_student(conn: &Connection, student: &Student) -> Result<()> {
    conn.execute(
        "INSERT INTO students
         (id, name, email, batch, selection_status, cpi, tenth_perc, twelfth_perc, diploma_perc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            batch = excluded.batch,
            selection_status = excluded.selection_status,
            cpi = excluded.cpi,
            tenth_perc = excluded.tenth_perc,
            twelfth_perc = excluded.twelfth_perc,
            diploma_perc = excluded.diploma_perc",
        params![
            student.id,
            student.name,
            student.email,
            student.batch,
            student.selection_status.to_string(),
            student.result.cpi,
            student.result.tenth_perc,
            student.result.twelfth_perc,
            student.result.diploma_perc,
        ],
    )?;

    conn.execute("DELETE FROM coding_profiles WHERE student_id = ?1", [&student.id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO coding_profiles (student_id, platform, stars, rating) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for entry in &student.competitive_coding {
        stmt.execute(params![student.id, entry.platform, entry.stars, entry.rating])?;
    }
    Ok(())
}

/// Upserts in place so existing eligibles and applications survive until
/// the next matching run overwrites them.
fn upsert_role(conn: &Connection, company_id: &str, role: &Role) -> Result<()> {
    let req = &role.requirements;
    conn.execute(
        "INSERT INTO roles
         (company_id, id, title, ctc, req_cpi, req_tenth_perc, req_twelfth_perc, req_diploma_perc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(company_id, id) DO UPDATE SET
            title = excluded.title,
            ctc = excluded.ctc,
            req_cpi = excluded.req_cpi,
            req_tenth_perc = excluded.req_tenth_perc,
            req_twelfth_perc = excluded.req_twelfth_perc,
            req_diploma_perc = excluded.req_diploma_perc",
        params![
            company_id,
            role.id,
            role.title,
            role.ctc,
            req.cpi,
            req.tenth_perc,
            req.twelfth_perc,
            req.diploma_perc,
        ],
    )?;

    conn.execute(
        "DELETE FROM role_coding_requirements WHERE company_id = ?1 AND role_id = ?2",
        params![company_id, role.id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO role_coding_requirements (company_id, role_id, platform, stars, rating)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for coding in &req.competitive_coding {
        stmt.execute(params![company_id, role.id, coding.platform, coding.stars, coding.rating])?;
    }
    Ok(())
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let status: String = row.get(4)?;
    let selection_status = status
        .parse::<SelectionStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))?;

    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        batch: row.get(3)?,
        selection_status,
        result: AcademicRecord {
            cpi: row.get(5)?,
            tenth_perc: row.get(6)?,
            twelfth_perc: row.get(7)?,
            diploma_perc: row.get(8)?,
        },
        competitive_coding: Vec::new(),
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("placement.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        (dir, db)
    }

    fn student(id: &str, batch: i32) -> Student {
        Student {
            id: id.into(),
            name: format!("Student {}", id),
            email: format!("{}@campus.edu", id.to_lowercase()),
            batch,
            selection_status: SelectionStatus::NotSelected,
            result: AcademicRecord {
                cpi: 8.0,
                tenth_perc: 80.0,
                twelfth_perc: Some(75.0),
                diploma_perc: None,
            },
            competitive_coding: vec![
                CodingProfileEntry { platform: "Codeforces".into(), stars: 3, rating: 1450 },
                CodingProfileEntry { platform: "LeetCode".into(), stars: 2, rating: 1700 },
            ],
        }
    }

    fn company() -> Company {
        Company {
            id: "acme".into(),
            name: "Acme Corp".into(),
            batch: 2024,
            roles: vec![Role {
                id: "sde".into(),
                title: "Software Engineer".into(),
                ctc: Some(12.5),
                requirements: Requirements {
                    cpi: Some(7.0),
                    competitive_coding: vec![CodingRequirement {
                        platform: "Codeforces".into(),
                        stars: 2,
                        rating: 1200,
                    }],
                    ..Requirements::default()
                },
                eligibles: Vec::new(),
                applications: Vec::new(),
                placed: Vec::new(),
            }],
        }
    }

    #[test]
    fn fetches_batch_in_insertion_order_with_profiles() {
        let (_dir, db) = open_temp();
        db.import_students(&[student("S3", 2024), student("S1", 2025), student("S2", 2024)])
            .unwrap();

        let fetched = db.fetch_students_by_batch(2024).unwrap();
        let ids: Vec<_> = fetched.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S2"]);
        assert_eq!(fetched[0].competitive_coding.len(), 2);
        assert_eq!(fetched[0].competitive_coding[1].platform, "LeetCode");
        assert!(db.fetch_students_by_batch(2030).unwrap().is_empty());
    }

    #[test]
    fn reimport_updates_in_place() {
        let (_dir, db) = open_temp();
        db.save_student(&student("S1", 2024)).unwrap();
        let mut changed = student("S1", 2024);
        changed.result.cpi = 9.1;
        changed.competitive_coding.truncate(1);
        db.save_student(&changed).unwrap();

        let stored = db.get_student("S1").unwrap().unwrap();
        assert_eq!(stored.result.cpi, 9.1);
        assert_eq!(stored.competitive_coding.len(), 1);
        assert_eq!(db.get_stats().unwrap().total_students, 1);
    }

    #[test]
    fn company_round_trip_keeps_requirements() {
        let (_dir, db) = open_temp();
        db.insert_company(&company()).unwrap();

        let stored = db.get_company("acme").unwrap();
        assert_eq!(stored.roles.len(), 1);
        assert_eq!(stored.roles[0].requirements.cpi, Some(7.0));
        assert_eq!(stored.roles[0].requirements.tenth_perc, None);
        assert_eq!(stored.roles[0].requirements.competitive_coding[0].rating, 1200);
        assert!(stored.roles[0].eligibles.is_empty());
    }

    #[test]
    fn duplicate_company_is_rejected() {
        let (_dir, db) = open_temp();
        db.insert_company(&company()).unwrap();
        assert!(matches!(
            db.insert_company(&company()),
            Err(PlacementError::Validation(_))
        ));
    }

    #[test]
    fn eligibility_write_replaces_snapshot_and_clears_applications() {
        let (_dir, db) = open_temp();
        db.import_students(&[student("S1", 2024), student("S2", 2024)]).unwrap();
        db.insert_company(&company()).unwrap();

        db.write_role_eligibility("acme", "sde", &["S1".into(), "S2".into()]).unwrap();
        db.add_application("acme", "sde", &Application::new("S1")).unwrap();
        assert_eq!(db.fetch_role("acme", "sde").unwrap().applications.len(), 1);

        db.write_role_eligibility("acme", "sde", &["S2".into()]).unwrap();
        let role = db.fetch_role("acme", "sde").unwrap();
        assert_eq!(role.eligibles, vec!["S2".to_string()]);
        assert!(role.applications.is_empty());
    }

    #[test]
    fn write_to_missing_role_is_not_found() {
        let (_dir, db) = open_temp();
        db.insert_company(&company()).unwrap();
        let err = db.write_role_eligibility("acme", "pm", &[]).unwrap_err();
        assert!(err.is_not_found());
        assert!(db.fetch_role("globex", "sde").unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_application_is_rejected() {
        let (_dir, db) = open_temp();
        db.save_student(&student("S1", 2024)).unwrap();
        db.insert_company(&company()).unwrap();
        db.add_application("acme", "sde", &Application::new("S1")).unwrap();
        assert!(matches!(
            db.add_application("acme", "sde", &Application::new("S1")),
            Err(PlacementError::AlreadyApplied(_))
        ));
    }

    #[test]
    fn replace_company_drops_removed_roles_and_keeps_snapshots() {
        let (_dir, db) = open_temp();
        let mut original = company();
        let mut analyst = original.roles[0].clone();
        analyst.id = "analyst".into();
        original.roles.push(analyst);
        db.insert_company(&original).unwrap();
        db.write_role_eligibility("acme", "sde", &["S1".into()]).unwrap();

        let mut updated = company();
        updated.name = "Acme Inc".into();
        updated.roles[0].requirements.cpi = Some(8.5);
        db.replace_company(&updated).unwrap();

        let stored = db.get_company("acme").unwrap();
        assert_eq!(stored.name, "Acme Inc");
        assert_eq!(stored.roles.len(), 1);
        assert_eq!(stored.roles[0].requirements.cpi, Some(8.5));
        assert_eq!(stored.roles[0].eligibles, vec!["S1".to_string()]);

        let mut missing = company();
        missing.id = "globex".into();
        assert!(db.replace_company(&missing).unwrap_err().is_not_found());
    }

    #[test]
    fn placement_marks_student_selected() {
        let (_dir, db) = open_temp();
        db.save_student(&student("S1", 2024)).unwrap();
        db.insert_company(&company()).unwrap();

        db.record_placement(&Placement {
            company_id: "acme".into(),
            role_id: "sde".into(),
            student_id: "S1".into(),
            placed_at: Utc::now(),
        })
        .unwrap();

        let stored = db.get_student_by_email("s1@campus.edu").unwrap().unwrap();
        assert_eq!(stored.selection_status, SelectionStatus::Selected);
        assert_eq!(db.fetch_role("acme", "sde").unwrap().placed, vec!["S1".to_string()]);
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.selected_students, 1);
        assert_eq!(stats.placements, 1);
    }

    #[test]
    fn offers_follow_the_snapshot() {
        let (_dir, db) = open_temp();
        db.import_students(&[student("S1", 2024), student("S2", 2024)]).unwrap();
        db.insert_company(&company()).unwrap();
        db.write_role_eligibility("acme", "sde", &["S1".into()]).unwrap();
        db.add_application("acme", "sde", &Application::new("S1")).unwrap();

        let offers = db.get_offers_for_student("S1").unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].company_name, "Acme Corp");
        assert!(offers[0].applied);
        assert!(db.get_offers_for_student("S2").unwrap().is_empty());
    }

    #[test]
    fn deleting_company_cascades() {
        let (_dir, db) = open_temp();
        db.save_student(&student("S1", 2024)).unwrap();
        db.insert_company(&company()).unwrap();
        db.write_role_eligibility("acme", "sde", &["S1".into()]).unwrap();

        db.delete_company("acme").unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.roles, 0);
        assert_eq!(stats.eligible_pairs, 0);
        assert!(db.delete_company("acme").unwrap_err().is_not_found());
        assert!(db.delete_student("nobody").unwrap_err().is_not_found());
    }
}
