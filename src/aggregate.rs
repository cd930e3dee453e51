use std::collections::{HashMap, HashSet};

use crate::model::{AggregateTable, CellValue, EnrichedRecord};

/// Sheet name for the degree distribution view.
pub const BY_DEGREE_SHEET: &str = "By_Stepen";
/// Sheet name for the mean total score view.
pub const AVG_TOTAL_SHEET: &str = "Avg_Total_Course";
/// Sheet name for the funding distribution view.
pub const BY_FUNDING_SHEET: &str = "By_Funding";
/// Sheet name for the mean midterm view.
pub const AVG_MIDTERM_SHEET: &str = "Avg_Midterm";
/// Sheet name for the mean attendance view.
pub const AVG_ATTENDANCE_SHEET: &str = "Avg_Attendance";

/// Computes the five aggregate views of the joined dataset, in report order.
pub fn build_views(records: &[EnrichedRecord]) -> Vec<AggregateTable> {
    vec![
        students_by_degree(records),
        avg_total_by_course(records),
        students_by_funding(records),
        avg_midterm_by_course(records),
        avg_attendance_by_course(records),
    ]
}

/// Unique-student count per degree level.
pub fn students_by_degree(records: &[EnrichedRecord]) -> AggregateTable {
    count_view(records, BY_DEGREE_SHEET, "Stepen", |record| &record.degree)
}

/// Mean total score per course, top 10.
pub fn avg_total_by_course(records: &[EnrichedRecord]) -> AggregateTable {
    mean_view(records, AVG_TOTAL_SHEET, "Total", |record| record.total, Some(10))
}

/// Unique-student count per funding source.
pub fn students_by_funding(records: &[EnrichedRecord]) -> AggregateTable {
    count_view(records, BY_FUNDING_SHEET, "Funding", |record| &record.funding)
}

/// Mean midterm score per course, top 5.
pub fn avg_midterm_by_course(records: &[EnrichedRecord]) -> AggregateTable {
    mean_view(records, AVG_MIDTERM_SHEET, "Midterm", |record| record.midterm, Some(5))
}

/// Mean attendance per course, top 5.
pub fn avg_attendance_by_course(records: &[EnrichedRecord]) -> AggregateTable {
    mean_view(
        records,
        AVG_ATTENDANCE_SHEET,
        "Attendance",
        |record| record.attendance,
        Some(5),
    )
}

/// Group-and-reduce: unique emails per key, descending by count. Groups are
/// discovered in input order, which also breaks ties; rows with an empty key
/// are excluded. The key extractor doubles as the first column.
fn count_view<'a, F>(
    records: &'a [EnrichedRecord],
    sheet_name: &str,
    key_column: &str,
    key: F,
) -> AggregateTable
where
    F: Fn(&'a EnrichedRecord) -> &'a str,
{
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, HashSet<&str>> = HashMap::new();

    for record in records {
        let group = key(record);
        if group.is_empty() {
            continue;
        }
        let entry = members.entry(group).or_insert_with(|| {
            order.push(group);
            HashSet::new()
        });
        entry.insert(record.email.as_str());
    }

    let mut groups: Vec<(&str, usize)> = order
        .iter()
        .map(|group| (*group, members[group].len()))
        .collect();
    groups.sort_by(|lhs, rhs| rhs.1.cmp(&lhs.1));

    AggregateTable {
        sheet_name: sheet_name.to_string(),
        columns: vec![key_column.to_string(), "Count".to_string()],
        rows: groups
            .into_iter()
            .map(|(group, count)| {
                vec![
                    CellValue::Text(group.to_string()),
                    CellValue::Number(count as f64),
                ]
            })
            .collect(),
    }
}

/// Group-and-reduce: mean of a metric per course, descending, truncated to
/// `top`. Missing values are excluded from the mean; a group with no
/// non-missing value yields a missing mean and sorts after every numeric
/// group. Tie order and discovery order follow the input.
fn mean_view<F>(
    records: &[EnrichedRecord],
    sheet_name: &str,
    value_column: &str,
    value: F,
    top: Option<usize>,
) -> AggregateTable
where
    F: Fn(&EnrichedRecord) -> Option<f64>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();

    for record in records {
        let course = record.course.as_str();
        if course.is_empty() {
            continue;
        }
        let entry = sums.entry(course).or_insert_with(|| {
            order.push(course);
            (0.0, 0)
        });
        if let Some(metric) = value(record) {
            entry.0 += metric;
            entry.1 += 1;
        }
    }

    let mut groups: Vec<(&str, Option<f64>)> = order
        .iter()
        .map(|course| {
            let (sum, count) = sums[course];
            let mean = if count > 0 { Some(sum / count as f64) } else { None };
            (*course, mean)
        })
        .collect();
    groups.sort_by(|lhs, rhs| match (lhs.1, rhs.1) {
        (Some(left), Some(right)) => right.total_cmp(&left),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    if let Some(limit) = top {
        groups.truncate(limit);
    }

    AggregateTable {
        sheet_name: sheet_name.to_string(),
        columns: vec!["Course".to_string(), value_column.to_string()],
        rows: groups
            .into_iter()
            .map(|(course, mean)| {
                vec![CellValue::Text(course.to_string()), CellValue::from_metric(mean)]
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, degree: &str, course: &str, total: Option<f64>) -> EnrichedRecord {
        EnrichedRecord {
            email: email.to_string(),
            full_name: format!("Student {email}"),
            degree: degree.to_string(),
            program: "SE".to_string(),
            group: "SE-2423".to_string(),
            funding: "grant".to_string(),
            course: course.to_string(),
            midterm: total.map(|value| value / 2.0),
            total,
            enrolled_course: None,
            attendance: None,
        }
    }

    #[test]
    fn degree_counts_are_per_student_not_per_row() {
        // One student appears on two course rows; the other has no degree.
        let records = vec![
            record("a@x.com", "BSc", "C1", Some(80.0)),
            record("a@x.com", "BSc", "C2", Some(90.0)),
            record("b@x.com", "", "C1", Some(70.0)),
            record("c@x.com", "MSc", "C1", Some(60.0)),
        ];

        let view = students_by_degree(&records);
        let total: f64 = view
            .rows
            .iter()
            .map(|row| match row[1] {
                CellValue::Number(count) => count,
                _ => 0.0,
            })
            .sum();
        // Two distinct students carry a degree value.
        assert_eq!(total, 2.0);
    }

    #[test]
    fn mean_excludes_missing_values() {
        let records = vec![
            record("a@x.com", "BSc", "C1", Some(80.0)),
            record("b@x.com", "BSc", "C1", None),
            record("c@x.com", "BSc", "C1", Some(90.0)),
        ];

        let view = avg_total_by_course(&records);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0][1], CellValue::Number(85.0));
    }

    #[test]
    fn all_missing_group_yields_missing_mean() {
        let records = vec![
            record("a@x.com", "BSc", "C1", None),
            record("b@x.com", "BSc", "C2", Some(50.0)),
        ];

        let view = avg_total_by_course(&records);
        assert_eq!(view.rows.len(), 2);
        // The numeric group sorts first, the all-missing group last.
        assert_eq!(view.rows[0][0], CellValue::Text("C2".to_string()));
        assert_eq!(view.rows[1][1], CellValue::Missing);
    }

    #[test]
    fn top_n_truncation_is_deterministic() {
        let mut records = Vec::new();
        for index in 0..12 {
            records.push(record(
                &format!("s{index}@x.com"),
                "BSc",
                &format!("C{index:02}"),
                Some(f64::from(index)),
            ));
        }

        let first = avg_total_by_course(&records);
        let second = avg_total_by_course(&records);
        assert_eq!(first, second);
        assert_eq!(first.rows.len(), 10);
        assert_eq!(first.rows[0][0], CellValue::Text("C11".to_string()));
    }

    #[test]
    fn ties_keep_input_order() {
        let records = vec![
            record("a@x.com", "BSc", "C1", Some(70.0)),
            record("b@x.com", "BSc", "C2", Some(70.0)),
        ];

        let view = avg_total_by_course(&records);
        assert_eq!(view.rows[0][0], CellValue::Text("C1".to_string()));
        assert_eq!(view.rows[1][0], CellValue::Text("C2".to_string()));
    }
}
