use std::fs;
use std::path::Path;

use cohort_analytics::aggregate;
use cohort_analytics::charts;
use cohort_analytics::config::AppConfig;
use cohort_analytics::interactive::INTERACTIVE_CHART_FILE;
use cohort_analytics::join;
use cohort_analytics::loader;
use cohort_analytics::model::CellValue;
use cohort_analytics::pipeline::{self, REPORT_FILE};
use tempfile::tempdir;

fn write_fixture_tables(dir: &Path) {
    fs::write(
        dir.join(loader::STUDENTS_FILE),
        "email,fio,stepen,op,gruppa,funding\n\
         A@x.com ,Alice,BSc,SE,SE-2423,grant\n\
         b@x.com,Bob,BSc,SE,SE-2423,paid\n\
         c@x.com,Cara,MSc,DS,DS-2301,grant\n\
         d@x.com,Dan,MSc,DS,DS-2301,paid\n",
    )
    .expect("students fixture");
    fs::write(
        dir.join(loader::GRADES_FILE),
        "Email,Course,Midterm,Total\n\
         a@x.com,Databases,40,85\n\
         a@x.com,Statistics,35,70\n\
         b@x.com,Databases,38,N/A\n\
         c@x.com,Statistics,30,65\n\
         ghost@x.com,Databases,20,50\n",
    )
    .expect("grades fixture");
    fs::write(
        dir.join(loader::ENROLLMENT_FILE),
        "email,course_id\n\
         a@x.com,ELEC-1\n\
         b@x.com,ELEC-2\n\
         c@x.com,ELEC-1\n",
    )
    .expect("enrollment fixture");
    fs::write(
        dir.join(loader::ATTENDANCE_FILE),
        "email,course,attendance\n\
         a@x.com,ELEC-1,90\n\
         c@x.com,ELEC-1,62\n\
         b@x.com,ELEC-9,75\n",
    )
    .expect("attendance fixture");
}

#[test]
fn analysis_pipeline_produces_all_artifacts() {
    let temp = tempdir().expect("temporary directory");
    let input_dir = temp.path().join("datasets");
    fs::create_dir_all(&input_dir).expect("input directory");
    write_fixture_tables(&input_dir);

    let config = AppConfig {
        input_dir,
        chart_dir: temp.path().join("charts"),
        export_dir: temp.path().join("exports"),
    };

    pipeline::run_analysis(&config).expect("pipeline run");

    assert!(config.export_dir.join(REPORT_FILE).exists());
    for chart in [
        charts::PIE_CHART_FILE,
        charts::BAR_CHART_FILE,
        charts::HBAR_CHART_FILE,
        charts::LINE_CHART_FILE,
        charts::HIST_CHART_FILE,
        charts::SCATTER_CHART_FILE,
    ] {
        assert!(config.chart_dir.join(chart).exists(), "missing chart {chart}");
    }
    assert!(config.chart_dir.join(INTERACTIVE_CHART_FILE).exists());
}

#[test]
fn joined_dataset_matches_expected_shape() {
    let temp = tempdir().expect("temporary directory");
    write_fixture_tables(temp.path());

    let dataset = loader::load_dataset(temp.path()).expect("dataset loaded");
    let records = join::enrich(&dataset);

    // Dan has no grade row and the ghost grade has no student row, so the
    // joined dataset covers three students across four grade rows.
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|record| !record.email.is_empty()));

    // Alice's trailing-space, mixed-case email was normalized at load time.
    let alice: Vec<_> = records
        .iter()
        .filter(|record| record.email == "a@x.com")
        .collect();
    assert_eq!(alice.len(), 2);
    assert!(alice.iter().all(|record| record.attendance == Some(90.0)));

    // Bob's attendance row is for a course he is not enrolled in; it must
    // not leak onto his ELEC-2 row.
    let bob = records
        .iter()
        .find(|record| record.email == "b@x.com")
        .expect("bob row");
    assert_eq!(bob.enrolled_course.as_deref(), Some("ELEC-2"));
    assert_eq!(bob.attendance, None);
}

#[test]
fn aggregate_views_reflect_the_fixture() {
    let temp = tempdir().expect("temporary directory");
    write_fixture_tables(temp.path());

    let dataset = loader::load_dataset(temp.path()).expect("dataset loaded");
    let records = join::enrich(&dataset);
    let views = aggregate::build_views(&records);
    assert_eq!(views.len(), 5);

    let by_degree = &views[0];
    let degree_total: f64 = by_degree
        .rows
        .iter()
        .map(|row| match row[1] {
            CellValue::Number(count) => count,
            _ => 0.0,
        })
        .sum();
    // Three distinct students survive the inner join, all with a degree.
    assert_eq!(degree_total, 3.0);

    // Bob's "N/A" total is excluded from the Databases mean, leaving
    // Alice's 85 as the course mean.
    let avg_total = &views[1];
    let databases = avg_total
        .rows
        .iter()
        .find(|row| row[0] == CellValue::Text("Databases".to_string()))
        .expect("Databases row");
    assert_eq!(databases[1], CellValue::Number(85.0));
}
