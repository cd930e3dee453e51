use std::collections::HashMap;

use tracing::debug;

use crate::model::{Attendance, Dataset, Enrollment, EnrichedRecord, Grade, Student};

/// Builds the joined dataset from the four normalized tables.
///
/// The join order is fixed: an inner join of students and grades anchors the
/// row count to students that actually have a grade record, then enrollment
/// and attendance enrich those rows without ever filtering them out.
pub fn enrich(dataset: &Dataset) -> Vec<EnrichedRecord> {
    let base = join_students_grades(&dataset.students, &dataset.grades);
    debug!(rows = base.len(), "students joined with grades");
    let with_enrollment = join_enrollment(base, &dataset.enrollment);
    debug!(rows = with_enrollment.len(), "enrollment attached");
    let enriched = join_attendance(with_enrollment, &dataset.attendance);
    debug!(rows = enriched.len(), "attendance attached");
    enriched
}

/// Inner join on email. Students without grades and grades without a
/// matching student are discarded. Rows come out in student order, expanded
/// by matching grades in grade order.
fn join_students_grades(students: &[Student], grades: &[Grade]) -> Vec<EnrichedRecord> {
    let mut grades_by_email: HashMap<&str, Vec<&Grade>> = HashMap::new();
    for grade in grades {
        grades_by_email.entry(&grade.email).or_default().push(grade);
    }

    let mut rows = Vec::new();
    for student in students {
        let Some(matches) = grades_by_email.get(student.email.as_str()) else {
            continue;
        };
        for grade in matches {
            rows.push(EnrichedRecord {
                email: student.email.clone(),
                full_name: student.full_name.clone(),
                degree: student.degree.clone(),
                program: student.program.clone(),
                group: student.group.clone(),
                funding: student.funding.clone(),
                course: grade.course.clone(),
                midterm: grade.midterm,
                total: grade.total,
                enrolled_course: None,
                attendance: None,
            });
        }
    }
    rows
}

/// Left join on email. Every input row survives; k matching enrollment rows
/// expand a row into k copies, zero matches keep the row unchanged.
fn join_enrollment(rows: Vec<EnrichedRecord>, enrollment: &[Enrollment]) -> Vec<EnrichedRecord> {
    let mut courses_by_email: HashMap<&str, Vec<&str>> = HashMap::new();
    for entry in enrollment {
        courses_by_email
            .entry(&entry.email)
            .or_default()
            .push(&entry.course_id);
    }

    let mut joined = Vec::with_capacity(rows.len());
    for row in rows {
        match courses_by_email.get(row.email.as_str()) {
            Some(courses) => {
                for course_id in courses {
                    let mut expanded = row.clone();
                    expanded.enrolled_course = Some((*course_id).to_string());
                    joined.push(expanded);
                }
            }
            None => joined.push(row),
        }
    }
    joined
}

/// Left join on (email, enrolled course). Attendance is matched per course;
/// a row whose enrollment course is absent keeps a missing attendance.
fn join_attendance(rows: Vec<EnrichedRecord>, attendance: &[Attendance]) -> Vec<EnrichedRecord> {
    let mut attendance_by_key: HashMap<(&str, &str), Vec<Option<f64>>> = HashMap::new();
    for entry in attendance {
        attendance_by_key
            .entry((&entry.email, &entry.course))
            .or_default()
            .push(entry.attendance);
    }

    let mut joined = Vec::with_capacity(rows.len());
    for row in rows {
        let key = row
            .enrolled_course
            .as_deref()
            .map(|course| (row.email.as_str(), course));
        match key.and_then(|key| attendance_by_key.get(&key)) {
            Some(values) => {
                for value in values {
                    let mut expanded = row.clone();
                    expanded.attendance = *value;
                    joined.push(expanded);
                }
            }
            None => joined.push(row),
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(email: &str, degree: &str) -> Student {
        Student {
            email: email.to_string(),
            full_name: format!("Student {email}"),
            degree: degree.to_string(),
            program: "SE".to_string(),
            group: "SE-2423".to_string(),
            funding: "grant".to_string(),
        }
    }

    fn grade(email: &str, course: &str, total: Option<f64>) -> Grade {
        Grade {
            email: email.to_string(),
            course: course.to_string(),
            midterm: total.map(|value| value / 2.0),
            total,
        }
    }

    fn enrollment(email: &str, course_id: &str) -> Enrollment {
        Enrollment {
            email: email.to_string(),
            course_id: course_id.to_string(),
        }
    }

    fn attendance(email: &str, course: &str, value: Option<f64>) -> Attendance {
        Attendance {
            email: email.to_string(),
            course: course.to_string(),
            attendance: value,
        }
    }

    #[test]
    fn inner_join_discards_unmatched_rows() {
        let dataset = Dataset {
            students: vec![student("a@x.com", "BSc"), student("b@x.com", "MSc")],
            grades: vec![grade("a@x.com", "C1", Some(85.0)), grade("ghost@x.com", "C1", Some(50.0))],
            ..Dataset::default()
        };

        let rows = enrich(&dataset);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "a@x.com");
        assert!(rows.len() <= dataset.students.len().min(dataset.grades.len()));
    }

    #[test]
    fn left_joins_never_reduce_row_count() {
        let dataset = Dataset {
            students: vec![student("a@x.com", "BSc")],
            grades: vec![grade("a@x.com", "C1", Some(85.0))],
            enrollment: vec![],
            attendance: vec![],
        };

        let rows = enrich(&dataset);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].enrolled_course, None);
        assert_eq!(rows[0].attendance, None);
    }

    #[test]
    fn multiple_enrollments_expand_rows() {
        let dataset = Dataset {
            students: vec![student("a@x.com", "BSc")],
            grades: vec![grade("a@x.com", "C1", Some(85.0))],
            enrollment: vec![enrollment("a@x.com", "E1"), enrollment("a@x.com", "E2")],
            attendance: vec![],
        };

        let rows = enrich(&dataset);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].enrolled_course.as_deref(), Some("E1"));
        assert_eq!(rows[1].enrolled_course.as_deref(), Some("E2"));
    }

    #[test]
    fn attendance_is_matched_per_course_not_globally() {
        let dataset = Dataset {
            students: vec![student("a@x.com", "BSc")],
            grades: vec![grade("a@x.com", "C1", Some(85.0))],
            enrollment: vec![enrollment("a@x.com", "courseA"), enrollment("a@x.com", "courseB")],
            attendance: vec![attendance("a@x.com", "courseA", Some(90.0))],
        };

        let rows = enrich(&dataset);
        assert_eq!(rows.len(), 2);

        let course_a = rows
            .iter()
            .find(|row| row.enrolled_course.as_deref() == Some("courseA"))
            .expect("courseA row");
        let course_b = rows
            .iter()
            .find(|row| row.enrolled_course.as_deref() == Some("courseB"))
            .expect("courseB row");
        assert_eq!(course_a.attendance, Some(90.0));
        assert_eq!(course_b.attendance, None);
    }

    #[test]
    fn normalized_keys_align_across_tables() {
        // Worked example: "A@x.com " in students matches "a@x.com" in grades
        // once both sides pass through key normalization at load time.
        let dataset = Dataset {
            students: vec![student("a@x.com", "BSc")],
            grades: vec![grade("a@x.com", "C1", Some(85.0))],
            ..Dataset::default()
        };

        let rows = enrich(&dataset);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "a@x.com");
        assert_eq!(rows[0].course, "C1");
        assert_eq!(rows[0].total, Some(85.0));
    }
}
