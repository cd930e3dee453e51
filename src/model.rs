use serde::Deserialize;

/// Raw student row as it appears in `students_raw.csv`. Field names mirror
/// the source headers; the Cyrillic-era column names (`fio`, `stepen`, `op`,
/// `gruppa`) are kept on the wire and mapped to domain names during
/// normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRow {
    pub email: String,
    pub fio: String,
    pub stepen: String,
    pub op: String,
    pub gruppa: String,
    pub funding: String,
}

/// Raw grade row from `grades_raw.csv`. Score columns arrive as free text and
/// are coerced later; values such as `N/A` must survive deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeRow {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Midterm")]
    pub midterm: String,
    #[serde(rename = "Total")]
    pub total: String,
}

/// Raw enrollment row from `enrollment_raw.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentRow {
    pub email: String,
    pub course_id: String,
}

/// Raw attendance row from `attendance.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceRow {
    pub email: String,
    pub course: String,
    pub attendance: String,
}

/// Student identity after key normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub email: String,
    pub full_name: String,
    pub degree: String,
    pub program: String,
    pub group: String,
    pub funding: String,
}

/// Grade record after key normalization and numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub email: String,
    pub course: String,
    pub midterm: Option<f64>,
    pub total: Option<f64>,
}

/// Enrollment record after key normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub email: String,
    pub course_id: String,
}

/// Attendance record after key normalization and numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct Attendance {
    pub email: String,
    pub course: String,
    pub attendance: Option<f64>,
}

/// The four normalized input tables, ready for joining.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub students: Vec<Student>,
    pub grades: Vec<Grade>,
    pub enrollment: Vec<Enrollment>,
    pub attendance: Vec<Attendance>,
}

/// One row of the joined dataset. Identity and grade fields are always
/// present; enrollment and attendance are optional dimensions that may be
/// absent when no matching row exists.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub email: String,
    pub full_name: String,
    pub degree: String,
    pub program: String,
    pub group: String,
    pub funding: String,
    pub course: String,
    pub midterm: Option<f64>,
    pub total: Option<f64>,
    pub enrolled_course: Option<String>,
    pub attendance: Option<f64>,
}

/// Represents a scalar cell in an exported table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Plain text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
    /// Explicitly missing value, exported as an empty cell.
    Missing,
}

impl CellValue {
    /// Wraps an optional metric, mapping `None` to [`CellValue::Missing`].
    pub fn from_metric(value: Option<f64>) -> Self {
        match value {
            Some(number) => CellValue::Number(number),
            None => CellValue::Missing,
        }
    }

    /// Renders the cell as a delimited-file field.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Text(value) => value.clone(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Missing => String::new(),
        }
    }
}

/// A table that will be materialised as a worksheet or a delimited file.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Normalizes an email join key: lower-cased and whitespace-trimmed.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalizes a course identifier: coerced to text and trimmed.
pub fn normalize_course(raw: &str) -> String {
    raw.trim().to_string()
}

/// Coerces a raw text field to a numeric value. Unparsable or empty input
/// becomes `None`, never an error.
pub fn parse_metric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
