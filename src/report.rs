use serde::Serialize;

use crate::records::ClassRecord;

/// Placeholder cell for data that is absent. Column layout never changes
/// based on data completeness.
pub const EMPTY_CELL: &str = "-";

/// Fixed table layout.
pub const COLUMNS: [&str; 3] = ["Student Name", "Student ID", "Attendance Time"];
const ROWS_PER_PAGE: usize = 25;
const NAME_WIDTH: usize = 32;
const ID_WIDTH: usize = 14;
const TIME_WIDTH: usize = 16;

const PLACEHOLDER_FILENAME: &str = "class_record.pdf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportHeader {
    pub course: String,
    pub classroom: String,
    pub lecturer: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_name: String,
    pub student_id: String,
    pub attendance_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub number: usize,
    pub rows: Vec<ReportRow>,
}

/// Structured, paginated session report. A pure projection of one record:
/// the on-screen preview and the exported file are produced from the same
/// value, so their content is byte-for-byte identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub title: String,
    pub header: ReportHeader,
    pub columns: Vec<String>,
    pub pages: Vec<ReportPage>,
    pub row_count: usize,
    pub suggested_filename: String,
}

fn cell(value: &str) -> String {
    if value.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        value.to_string()
    }
}

/// Render a session into its report document. Total: an absent record yields
/// a well-formed placeholder document with one empty page.
pub fn render(record: Option<&ClassRecord>) -> ReportDocument {
    let Some(record) = record else {
        return ReportDocument {
            title: "Class Attendance Report".to_string(),
            header: ReportHeader {
                course: EMPTY_CELL.to_string(),
                classroom: EMPTY_CELL.to_string(),
                lecturer: EMPTY_CELL.to_string(),
                date: EMPTY_CELL.to_string(),
                start_time: EMPTY_CELL.to_string(),
                end_time: EMPTY_CELL.to_string(),
            },
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            pages: vec![ReportPage {
                number: 1,
                rows: vec![],
            }],
            row_count: 0,
            suggested_filename: PLACEHOLDER_FILENAME.to_string(),
        };
    };

    // Duplicates and ordering come straight from the record: render all,
    // in stored arrival order.
    let rows: Vec<ReportRow> = record
        .attendance
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|entry| ReportRow {
            student_name: cell(&entry.student_name),
            student_id: cell(&entry.student_id),
            attendance_time: cell(&entry.attendance_time),
        })
        .collect();
    let row_count = rows.len();

    let mut pages: Vec<ReportPage> = rows
        .chunks(ROWS_PER_PAGE)
        .enumerate()
        .map(|(i, chunk)| ReportPage {
            number: i + 1,
            rows: chunk.to_vec(),
        })
        .collect();
    if pages.is_empty() {
        pages.push(ReportPage {
            number: 1,
            rows: vec![],
        });
    }

    ReportDocument {
        title: "Class Attendance Report".to_string(),
        header: ReportHeader {
            course: cell(&record.course),
            classroom: cell(&record.classroom),
            lecturer: record
                .lecturer
                .as_deref()
                .map(cell)
                .unwrap_or_else(|| EMPTY_CELL.to_string()),
            date: cell(&record.date),
            start_time: cell(&record.start_time),
            end_time: cell(&record.end_time),
        },
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        pages,
        row_count,
        suggested_filename: format!("{}.pdf", record.class_id),
    }
}

impl ReportDocument {
    /// Deterministic byte layout of the document. Both the preview surface
    /// and the export sink consume exactly these bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&"=".repeat(self.title.len()));
        out.push('\n');
        for (label, value) in [
            ("Course", &self.header.course),
            ("Classroom", &self.header.classroom),
            ("Lecturer", &self.header.lecturer),
            ("Date", &self.header.date),
            ("Start Time", &self.header.start_time),
            ("End Time", &self.header.end_time),
        ] {
            out.push_str(&format!("{:<10} : {}\n", label, value));
        }

        let total_pages = self.pages.len();
        for page in &self.pages {
            out.push('\n');
            out.push_str(&format!("-- Page {} of {} --\n", page.number, total_pages));
            out.push_str(&format!(
                "{:<nw$} | {:<iw$} | {:<tw$}\n",
                COLUMNS[0],
                COLUMNS[1],
                COLUMNS[2],
                nw = NAME_WIDTH,
                iw = ID_WIDTH,
                tw = TIME_WIDTH,
            ));
            out.push_str(&format!(
                "{}-+-{}-+-{}\n",
                "-".repeat(NAME_WIDTH),
                "-".repeat(ID_WIDTH),
                "-".repeat(TIME_WIDTH),
            ));
            for row in &page.rows {
                out.push_str(&format!(
                    "{:<nw$} | {:<iw$} | {:<tw$}\n",
                    row.student_name,
                    row.student_id,
                    row.attendance_time,
                    nw = NAME_WIDTH,
                    iw = ID_WIDTH,
                    tw = TIME_WIDTH,
                ));
            }
        }
        out.into_bytes()
    }
}
