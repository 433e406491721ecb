use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("classrec.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    create_schema(&conn)?;
    Ok(conn)
}

pub fn create_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_records(
            id TEXT PRIMARY KEY,
            lecturer TEXT,
            classroom TEXT NOT NULL,
            course TEXT NOT NULL,
            date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            has_attendance INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;

    // No UNIQUE constraint on (class_id, student_id): duplicate check-ins by
    // the same student are recorded, not collapsed. sort_order is arrival
    // order within the session.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_entries(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            student_id TEXT NOT NULL,
            attendance_time TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(class_id) REFERENCES class_records(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_entries_class
         ON attendance_entries(class_id, sort_order)",
        [],
    )?;

    Ok(())
}
