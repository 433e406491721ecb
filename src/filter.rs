use crate::records::ClassRecord;

type ScalarAccessor = for<'a> fn(&'a ClassRecord) -> Option<&'a str>;

/// How a searchable field is matched against the query.
enum MatchStrategy {
    /// Present-and-contains on a single string field.
    Scalar(ScalarAccessor),
    /// Any attendance entry whose studentName contains the query.
    /// Other entry sub-fields are deliberately not searched.
    AttendanceNames,
}

fn lecturer(r: &ClassRecord) -> Option<&str> {
    r.lecturer.as_deref()
}
fn course(r: &ClassRecord) -> Option<&str> {
    Some(r.course.as_str())
}
fn classroom(r: &ClassRecord) -> Option<&str> {
    Some(r.classroom.as_str())
}
fn date(r: &ClassRecord) -> Option<&str> {
    Some(r.date.as_str())
}
fn start_time(r: &ClassRecord) -> Option<&str> {
    Some(r.start_time.as_str())
}
fn end_time(r: &ClassRecord) -> Option<&str> {
    Some(r.end_time.as_str())
}

/// The fixed set of searchable fields, checked as a logical OR.
const SEARCH_FIELDS: &[MatchStrategy] = &[
    MatchStrategy::Scalar(lecturer),
    MatchStrategy::Scalar(course),
    MatchStrategy::Scalar(classroom),
    MatchStrategy::Scalar(date),
    MatchStrategy::Scalar(start_time),
    MatchStrategy::Scalar(end_time),
    MatchStrategy::AttendanceNames,
];

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// True when any searchable field of `record` matches `query`.
/// Absent fields never match and never error.
pub fn record_matches(record: &ClassRecord, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    SEARCH_FIELDS.iter().any(|strategy| match strategy {
        MatchStrategy::Scalar(accessor) => {
            accessor(record).is_some_and(|v| contains_ci(v, &needle))
        }
        MatchStrategy::AttendanceNames => record
            .attendance
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .any(|entry| contains_ci(&entry.student_name, &needle)),
    })
}

/// Order-preserving subsequence of `records` matching `query`.
///
/// Pure function of its inputs; called on every keystroke, so it keeps no
/// state between invocations. The empty query matches every record.
pub fn filter_records<'a>(records: &'a [ClassRecord], query: &str) -> Vec<&'a ClassRecord> {
    records.iter().filter(|r| record_matches(r, query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::StudentAttendance;

    fn record(class_id: &str, course: &str, lecturer: Option<&str>) -> ClassRecord {
        ClassRecord {
            class_id: class_id.to_string(),
            lecturer: lecturer.map(|s| s.to_string()),
            classroom: "Classroom 1".to_string(),
            course: course.to_string(),
            date: "2024-03-11".to_string(),
            start_time: "09:00".to_string(),
            end_time: "11:00".to_string(),
            attendance: None,
        }
    }

    fn with_attendance(mut r: ClassRecord, names: &[&str]) -> ClassRecord {
        r.attendance = Some(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| StudentAttendance {
                    student_name: name.to_string(),
                    student_id: format!("S{:03}", i),
                    attendance_time: format!("09:{:02}", i),
                })
                .collect(),
        );
        r
    }

    #[test]
    fn empty_query_is_identity() {
        let records = vec![
            record("c1", "Security", Some("Dr. Lim")),
            record("c2", "Secretary", None),
            record("c3", "Food & Beverage", Some("Ms. Wong")),
        ];
        let filtered = filter_records(&records, "");
        assert_eq!(filtered.len(), records.len());
        for (kept, original) in filtered.iter().zip(records.iter()) {
            assert_eq!(kept.class_id, original.class_id);
        }
    }

    #[test]
    fn scalar_match_is_case_insensitive() {
        let records = vec![record("c1", "Information Technology", None)];
        assert_eq!(filter_records(&records, "information").len(), 1);
        assert_eq!(filter_records(&records, "INFORMATION").len(), 1);
        assert_eq!(filter_records(&records, "nology").len(), 1);
        assert_eq!(filter_records(&records, "chemistry").len(), 0);
    }

    #[test]
    fn attendance_names_match_even_when_no_scalar_field_does() {
        let r = with_attendance(record("c1", "Security", None), &["Alice Tan", "Bob Lee"]);
        assert!(record_matches(&r, "alice"));
        assert!(record_matches(&r, "LEE"));
        // Entry sub-fields other than studentName are ignored.
        assert!(!record_matches(&r, "S001"));
    }

    #[test]
    fn absent_lecturer_is_skipped_not_an_error() {
        let records = vec![
            record("c1", "Security", None),
            record("c2", "Security", Some("Dr. Lim")),
        ];
        let filtered = filter_records(&records, "lim");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].class_id, "c2");
    }

    #[test]
    fn matches_keep_original_collection_order() {
        let records = vec![
            record("c1", "Security 2", None),
            record("c2", "Secretary", None),
            record("c3", "Security 1", None),
        ];
        let filtered = filter_records(&records, "security");
        let ids: Vec<&str> = filtered.iter().map(|r| r.class_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn duplicate_students_are_not_deduplicated_by_the_filter() {
        let r = with_attendance(record("c1", "Security", None), &["Alice Tan", "Alice Tan"]);
        let records = vec![r];
        // Inclusion only; the record appears once regardless of duplicates.
        assert_eq!(filter_records(&records, "alice").len(), 1);
    }
}
