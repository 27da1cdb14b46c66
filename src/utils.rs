use colored::Colorize;
use serde::de::DeserializeOwned;
use crate::error::Result;

/// Reads and parses a JSON document from disk.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Format a CTC figure (lakhs per annum), or a dash when unknown
pub fn format_ctc(ctc: Option<f64>) -> String {
    match ctc {
        Some(value) => format!("{:.2} LPA", value).yellow().to_string(),
        None => "-".to_string(),
    }
}

pub fn format_flag(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Prompt user for yes/no confirmation
pub fn confirm_action(prompt: &str) -> Result<bool> {
    use std::io::{self, Write};

    print!("{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i < widths.len() {
            row.push_str(&format!("{:<width$}  ", col, width = widths[i]));
        }
    }
    println!("{}", row.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Student;

    #[test]
    fn reads_student_list_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.json");
        std::fs::write(
            &path,
            r#"[{"id":"S1","name":"Asha","email":"asha@campus.edu","batch":2024,
                 "result":{"cpi":8.1,"tenth_perc":88.0,"twelfth_perc":91.0}}]"#,
        )
        .unwrap();

        let students: Vec<Student> = read_json(path.to_str().unwrap()).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].result.twelfth(), 91.0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_json::<Vec<Student>>("/nonexistent/students.json").unwrap_err();
        assert!(matches!(err, crate::error::PlacementError::Io(_)));
    }

    #[test]
    fn unknown_ctc_renders_dash() {
        assert_eq!(format_ctc(None), "-");
    }
}
