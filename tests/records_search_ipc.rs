use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_classrecd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classrecd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().expect("result")
}

fn seed_record(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    record: serde_json::Value,
) -> String {
    let result = request_ok(stdin, reader, id, "records.create", record);
    result
        .get("record")
        .and_then(|v| v.get("classId"))
        .and_then(|v| v.as_str())
        .expect("classId")
        .to_string()
}

fn search_ids(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    query: &str,
) -> Vec<String> {
    let result = request_ok(stdin, reader, id, "records.search", json!({ "query": query }));
    result
        .get("records")
        .and_then(|v| v.as_array())
        .expect("records array")
        .iter()
        .map(|r| {
            r.get("classId")
                .and_then(|v| v.as_str())
                .expect("classId")
                .to_string()
        })
        .collect()
}

#[test]
fn search_matches_scalar_and_nested_fields_case_insensitively() {
    let workspace = temp_dir("classrec-search");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Record with no lecturer: null fields must be skipped, never an error.
    let it_id = seed_record(
        &mut stdin,
        &mut reader,
        "2",
        json!({
            "lecturer": null,
            "classroom": "Classroom 1",
            "course": "Information Technology",
            "date": "2024-03-11",
            "startTime": "09:00",
            "endTime": "11:00",
            "attendance": [
                { "studentName": "Alice Tan", "studentId": "S001", "attendanceTime": "09:01" }
            ]
        }),
    );
    let sec_id = seed_record(
        &mut stdin,
        &mut reader,
        "3",
        json!({
            "lecturer": "Dr. Lim",
            "classroom": "Classroom 2",
            "course": "Security",
            "date": "2024-03-12",
            "startTime": "14:00",
            "endTime": "16:00"
        }),
    );

    let opened = request_ok(&mut stdin, &mut reader, "4", "records.open", json!({}));
    assert_eq!(opened.get("count").and_then(|v| v.as_u64()), Some(2));

    // Empty query is the canonical no-filter state: everything, in order.
    let all = search_ids(&mut stdin, &mut reader, "5", "");
    assert_eq!(all, vec![it_id.clone(), sec_id.clone()]);

    // Case-insensitive scalar substring.
    assert_eq!(
        search_ids(&mut stdin, &mut reader, "6", "INFORMATION"),
        vec![it_id.clone()]
    );
    assert_eq!(
        search_ids(&mut stdin, &mut reader, "7", "information"),
        vec![it_id.clone()]
    );

    // Nested attendance studentName match; no scalar field contains "alice".
    assert_eq!(
        search_ids(&mut stdin, &mut reader, "8", "alice"),
        vec![it_id.clone()]
    );

    // Lecturer match skips the record whose lecturer is null.
    assert_eq!(
        search_ids(&mut stdin, &mut reader, "9", "lim"),
        vec![sec_id.clone()]
    );

    // No match at all.
    assert!(search_ids(&mut stdin, &mut reader, "10", "chemistry").is_empty());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn search_reflects_snapshot_refresh_after_update() {
    let workspace = temp_dir("classrec-search-refresh");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let class_id = seed_record(
        &mut stdin,
        &mut reader,
        "2",
        json!({
            "classroom": "Classroom 1",
            "course": "Secretary",
            "date": "2024-03-11",
            "startTime": "09:00",
            "endTime": "11:00"
        }),
    );
    request_ok(&mut stdin, &mut reader, "3", "records.open", json!({}));

    assert!(search_ids(&mut stdin, &mut reader, "4", "food").is_empty());

    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "records.update",
        json!({
            "classId": class_id,
            "patch": { "course": "Food & Beverage" }
        }),
    );

    // The write refreshed the snapshot; the same query now matches.
    assert_eq!(
        search_ids(&mut stdin, &mut reader, "6", "food"),
        vec![class_id]
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
