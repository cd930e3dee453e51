use std::path::Path;

use tracing::debug;

use crate::error::{Result, ToolError};
use crate::model::{
    Attendance, AttendanceRow, Dataset, Enrollment, EnrollmentRow, Grade, GradeRow, Student,
    StudentRow, normalize_course, normalize_email, parse_metric,
};

/// File name of the student table inside the input directory.
pub const STUDENTS_FILE: &str = "students_raw.csv";
/// File name of the grade table.
pub const GRADES_FILE: &str = "grades_raw.csv";
/// File name of the enrollment table.
pub const ENROLLMENT_FILE: &str = "enrollment_raw.csv";
/// File name of the attendance table.
pub const ATTENDANCE_FILE: &str = "attendance.csv";

/// Reads the four delimited tables from the input directory and applies key
/// normalization and numeric coercion. Normalization never drops rows; only
/// a missing file or a malformed table aborts the load.
pub fn load_dataset(input_dir: &Path) -> Result<Dataset> {
    let students = load_students(&input_dir.join(STUDENTS_FILE))?;
    let grades = load_grades(&input_dir.join(GRADES_FILE))?;
    let enrollment = load_enrollment(&input_dir.join(ENROLLMENT_FILE))?;
    let attendance = load_attendance(&input_dir.join(ATTENDANCE_FILE))?;

    debug!(
        students = students.len(),
        grades = grades.len(),
        enrollment = enrollment.len(),
        attendance = attendance.len(),
        "input tables loaded"
    );

    Ok(Dataset {
        students,
        grades,
        enrollment,
        attendance,
    })
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    Ok(csv::Reader::from_path(path)?)
}

fn load_students(path: &Path) -> Result<Vec<Student>> {
    let mut reader = open_reader(path)?;
    let mut students = Vec::new();
    for row in reader.deserialize::<StudentRow>() {
        let row = row?;
        students.push(Student {
            email: normalize_email(&row.email),
            full_name: row.fio,
            degree: row.stepen,
            program: row.op,
            group: row.gruppa,
            funding: row.funding,
        });
    }
    Ok(students)
}

fn load_grades(path: &Path) -> Result<Vec<Grade>> {
    let mut reader = open_reader(path)?;
    let mut grades = Vec::new();
    for row in reader.deserialize::<GradeRow>() {
        let row = row?;
        grades.push(Grade {
            email: normalize_email(&row.email),
            course: normalize_course(&row.course),
            midterm: parse_metric(&row.midterm),
            total: parse_metric(&row.total),
        });
    }
    Ok(grades)
}

fn load_enrollment(path: &Path) -> Result<Vec<Enrollment>> {
    let mut reader = open_reader(path)?;
    let mut enrollment = Vec::new();
    for row in reader.deserialize::<EnrollmentRow>() {
        let row = row?;
        enrollment.push(Enrollment {
            email: normalize_email(&row.email),
            course_id: normalize_course(&row.course_id),
        });
    }
    Ok(enrollment)
}

fn load_attendance(path: &Path) -> Result<Vec<Attendance>> {
    let mut reader = open_reader(path)?;
    let mut attendance = Vec::new();
    for row in reader.deserialize::<AttendanceRow>() {
        let row = row?;
        attendance.push(Attendance {
            email: normalize_email(&row.email),
            course: normalize_course(&row.course),
            attendance: parse_metric(&row.attendance),
        });
    }
    Ok(attendance)
}
