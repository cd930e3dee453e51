use std::collections::{HashMap, HashSet};
use std::path::Path;

use plotly::common::{Marker, Mode, Title};
use plotly::layout::{Axis, Layout};
use plotly::{Plot, Scatter};
use tracing::debug;

use crate::aggregate;
use crate::error::Result;
use crate::model::{CellValue, EnrichedRecord};

/// File name of the interactive chart artifact.
pub const INTERACTIVE_CHART_FILE: &str = "interactive_avg_total_by_course.html";

/// Builds the interactive chart: mean total score per course for the top-10
/// courses by overall mean total, one trace per funding source, bubble size
/// encoding the mean, y-axis clamped to [0, max + 10]. The artifact is a
/// self-contained HTML file with no downstream consumer.
pub fn render_interactive(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    let top_view = aggregate::avg_total_by_course(records);
    let top_courses: Vec<String> = top_view
        .rows
        .iter()
        .filter_map(|row| match (row.first(), row.get(1)) {
            (Some(CellValue::Text(course)), Some(CellValue::Number(_))) => Some(course.clone()),
            _ => None,
        })
        .collect();

    let groups = group_means(records, &top_courses);

    let y_max = groups
        .iter()
        .flat_map(|(_, means)| means.iter().map(|(_, mean)| *mean))
        .fold(0.0, f64::max)
        + 10.0;

    let mut plot = Plot::new();
    for (funding, means) in &groups {
        let courses: Vec<String> = means.iter().map(|(course, _)| course.clone()).collect();
        let values: Vec<f64> = means.iter().map(|(_, mean)| *mean).collect();
        let sizes: Vec<usize> = values
            .iter()
            .map(|mean| mean.round().max(1.0) as usize)
            .collect();
        let trace = Scatter::new(courses, values)
            .name(funding)
            .mode(Mode::Markers)
            .marker(Marker::new().size_array(sizes));
        plot.add_trace(trace);
    }

    plot.set_layout(
        Layout::new()
            .title(Title::with_text(
                "Average total score for top-10 courses by funding source",
            ))
            .x_axis(Axis::new().title(Title::with_text("Course")))
            .y_axis(
                Axis::new()
                    .title(Title::with_text("Average total"))
                    .range(vec![0.0, y_max]),
            ),
    );

    plot.write_html(path);
    debug!(path = %path.display(), traces = groups.len(), "interactive chart written");
    Ok(())
}

/// Mean total per (funding, course) pair, restricted to the given courses.
/// Funding sources and courses keep their first-appearance order.
fn group_means(
    records: &[EnrichedRecord],
    courses: &[String],
) -> Vec<(String, Vec<(String, f64)>)> {
    let course_set: HashSet<&str> = courses.iter().map(String::as_str).collect();

    let mut funding_order: Vec<&str> = Vec::new();
    let mut sums: HashMap<(&str, &str), (f64, usize)> = HashMap::new();
    for record in records {
        let Some(total) = record.total else { continue };
        if !course_set.contains(record.course.as_str()) {
            continue;
        }
        if !funding_order.contains(&record.funding.as_str()) {
            funding_order.push(&record.funding);
        }
        let entry = sums
            .entry((record.funding.as_str(), record.course.as_str()))
            .or_insert((0.0, 0));
        entry.0 += total;
        entry.1 += 1;
    }

    funding_order
        .into_iter()
        .map(|funding| {
            let means: Vec<(String, f64)> = courses
                .iter()
                .filter_map(|course| {
                    sums.get(&(funding, course.as_str()))
                        .map(|(sum, count)| (course.clone(), sum / *count as f64))
                })
                .collect();
            (funding.to_string(), means)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(funding: &str, course: &str, total: Option<f64>) -> EnrichedRecord {
        EnrichedRecord {
            email: "a@x.com".to_string(),
            full_name: "Student A".to_string(),
            degree: "BSc".to_string(),
            program: "SE".to_string(),
            group: "SE-2423".to_string(),
            funding: funding.to_string(),
            course: course.to_string(),
            midterm: None,
            total,
            enrolled_course: None,
            attendance: None,
        }
    }

    #[test]
    fn means_are_grouped_per_funding_and_course() {
        let records = vec![
            record("grant", "C1", Some(80.0)),
            record("grant", "C1", Some(90.0)),
            record("paid", "C1", Some(60.0)),
            record("grant", "C2", None),
        ];
        let courses = vec!["C1".to_string(), "C2".to_string()];

        let groups = group_means(&records, &courses);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "grant");
        assert_eq!(groups[0].1, vec![("C1".to_string(), 85.0)]);
        assert_eq!(groups[1].1, vec![("C1".to_string(), 60.0)]);
    }

    #[test]
    fn chart_is_written_as_html() {
        let temp = tempfile::tempdir().expect("temporary directory");
        let path = temp.path().join(INTERACTIVE_CHART_FILE);
        let records = vec![record("grant", "C1", Some(80.0))];

        render_interactive(&path, &records).expect("chart rendered");
        assert!(path.exists());
    }
}
