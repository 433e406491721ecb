use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One student's check-in event within a session. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub student_name: String,
    pub student_id: String,
    pub attendance_time: String,
}

/// One scheduled class meeting with its recorded attendance.
///
/// `attendance == None` means the session has no attendance record at all;
/// `Some(vec![])` means an attendance record exists but nobody checked in.
/// The distinction round-trips through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub class_id: String,
    pub lecturer: Option<String>,
    pub classroom: String,
    pub course: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Vec<StudentAttendance>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StoreError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn query(e: rusqlite::Error) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    fn update(e: rusqlite::Error) -> Self {
        Self::new("db_update_failed", e.to_string())
    }
}

/// Fields accepted by `records.create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub lecturer: Option<String>,
    pub classroom: String,
    pub course: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub attendance: Option<Vec<StudentAttendance>>,
}

/// Partial update applied by `records.update`. Absent fields are untouched.
/// `attendance`, when present, replaces the whole sequence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub lecturer: Option<Option<String>>,
    #[serde(default)]
    pub classroom: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub attendance: Option<Vec<StudentAttendance>>,
}

// Distinguishes `"lecturer": null` (clear) from the key being absent (keep).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

fn load_attendance(
    conn: &Connection,
    class_id: &str,
) -> Result<Vec<StudentAttendance>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT student_name, student_id, attendance_time
             FROM attendance_entries
             WHERE class_id = ?
             ORDER BY sort_order",
        )
        .map_err(StoreError::query)?;
    stmt.query_map([class_id], |r| {
        Ok(StudentAttendance {
            student_name: r.get(0)?,
            student_id: r.get(1)?,
            attendance_time: r.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(StoreError::query)
}

fn row_to_record(r: &rusqlite::Row<'_>) -> rusqlite::Result<(ClassRecord, bool)> {
    let record = ClassRecord {
        class_id: r.get(0)?,
        lecturer: r.get(1)?,
        classroom: r.get(2)?,
        course: r.get(3)?,
        date: r.get(4)?,
        start_time: r.get(5)?,
        end_time: r.get(6)?,
        attendance: None,
    };
    let has_attendance: i64 = r.get(7)?;
    Ok((record, has_attendance != 0))
}

const RECORD_COLUMNS: &str =
    "id, lecturer, classroom, course, date, start_time, end_time, has_attendance";

/// Load the full record collection in insertion order.
pub fn fetch_all_records(conn: &Connection) -> Result<Vec<ClassRecord>, StoreError> {
    let sql = format!(
        "SELECT {} FROM class_records ORDER BY rowid",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::query)?;
    let rows = stmt
        .query_map([], row_to_record)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::query)?;

    let mut records = Vec::with_capacity(rows.len());
    for (mut record, has_attendance) in rows {
        if has_attendance {
            record.attendance = Some(load_attendance(conn, &record.class_id)?);
        }
        records.push(record);
    }
    Ok(records)
}

pub fn get_record(conn: &Connection, class_id: &str) -> Result<Option<ClassRecord>, StoreError> {
    let sql = format!("SELECT {} FROM class_records WHERE id = ?", RECORD_COLUMNS);
    let row = conn
        .query_row(&sql, [class_id], row_to_record)
        .optional()
        .map_err(StoreError::query)?;
    let Some((mut record, has_attendance)) = row else {
        return Ok(None);
    };
    if has_attendance {
        record.attendance = Some(load_attendance(conn, &record.class_id)?);
    }
    Ok(Some(record))
}

fn replace_attendance(
    conn: &Connection,
    class_id: &str,
    entries: &[StudentAttendance],
) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM attendance_entries WHERE class_id = ?",
        [class_id],
    )
    .map_err(StoreError::update)?;
    for (i, entry) in entries.iter().enumerate() {
        conn.execute(
            "INSERT INTO attendance_entries(id, class_id, student_name, student_id, attendance_time, sort_order)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                class_id,
                &entry.student_name,
                &entry.student_id,
                &entry.attendance_time,
                i as i64,
            ),
        )
        .map_err(StoreError::update)?;
    }
    Ok(())
}

/// Insert a new session. A `classId` is generated when the caller omits one;
/// a caller-supplied id that already exists is rejected.
pub fn insert_record(conn: &Connection, new: &NewRecord) -> Result<ClassRecord, StoreError> {
    let class_id = new
        .class_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM class_records WHERE id = ?", [&class_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(StoreError::query)?;
    if exists.is_some() {
        return Err(StoreError::new("conflict", "classId already exists"));
    }

    let now = Utc::now().to_rfc3339();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;
    tx.execute(
        "INSERT INTO class_records(id, lecturer, classroom, course, date, start_time, end_time, has_attendance, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &class_id,
            &new.lecturer,
            &new.classroom,
            &new.course,
            &new.date,
            &new.start_time,
            &new.end_time,
            new.attendance.is_some() as i64,
            &now,
            &now,
        ),
    )
    .map_err(|e| StoreError {
        code: "db_insert_failed".to_string(),
        message: e.to_string(),
        details: Some(serde_json::json!({ "table": "class_records" })),
    })?;
    if let Some(entries) = &new.attendance {
        replace_attendance(&tx, &class_id, entries)?;
    }
    tx.commit()
        .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))?;

    get_record(conn, &class_id)?.ok_or_else(|| StoreError::new("not_found", "record not found"))
}

/// Apply a partial update and return the refreshed record.
pub fn update_record(
    conn: &Connection,
    class_id: &str,
    patch: &RecordPatch,
) -> Result<ClassRecord, StoreError> {
    let existing = get_record(conn, class_id)?
        .ok_or_else(|| StoreError::new("not_found", "record not found"))?;

    let lecturer = match &patch.lecturer {
        Some(v) => v.clone(),
        None => existing.lecturer.clone(),
    };
    let classroom = patch.classroom.clone().unwrap_or(existing.classroom);
    let course = patch.course.clone().unwrap_or(existing.course);
    let date = patch.date.clone().unwrap_or(existing.date);
    let start_time = patch.start_time.clone().unwrap_or(existing.start_time);
    let end_time = patch.end_time.clone().unwrap_or(existing.end_time);
    let has_attendance = patch.attendance.is_some() || existing.attendance.is_some();

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;
    tx.execute(
        "UPDATE class_records
         SET lecturer = ?, classroom = ?, course = ?, date = ?, start_time = ?, end_time = ?,
             has_attendance = ?, updated_at = ?
         WHERE id = ?",
        (
            &lecturer,
            &classroom,
            &course,
            &date,
            &start_time,
            &end_time,
            has_attendance as i64,
            Utc::now().to_rfc3339(),
            class_id,
        ),
    )
    .map_err(StoreError::update)?;
    if let Some(entries) = &patch.attendance {
        replace_attendance(&tx, class_id, entries)?;
    }
    tx.commit()
        .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))?;

    get_record(conn, class_id)?.ok_or_else(|| StoreError::new("not_found", "record not found"))
}

/// Append one check-in at the end of the session's attendance sequence.
/// Duplicate studentIds are allowed; arrival order is what matters.
pub fn append_attendance(
    conn: &Connection,
    class_id: &str,
    entry: &StudentAttendance,
) -> Result<ClassRecord, StoreError> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM class_records WHERE id = ?", [class_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(StoreError::query)?;
    if exists.is_none() {
        return Err(StoreError::new("not_found", "record not found"));
    }

    let next_order: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM attendance_entries WHERE class_id = ?",
            [class_id],
            |r| r.get(0),
        )
        .map_err(StoreError::query)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;
    tx.execute(
        "INSERT INTO attendance_entries(id, class_id, student_name, student_id, attendance_time, sort_order)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            class_id,
            &entry.student_name,
            &entry.student_id,
            &entry.attendance_time,
            next_order,
        ),
    )
    .map_err(StoreError::update)?;
    tx.execute(
        "UPDATE class_records SET has_attendance = 1, updated_at = ? WHERE id = ?",
        (Utc::now().to_rfc3339(), class_id),
    )
    .map_err(StoreError::update)?;
    tx.commit()
        .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))?;

    get_record(conn, class_id)?.ok_or_else(|| StoreError::new("not_found", "record not found"))
}
