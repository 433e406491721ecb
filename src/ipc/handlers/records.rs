use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::records::{self, NewRecord, RecordPatch, StoreError, StudentAttendance};
use rusqlite::Connection;
use serde_json::json;

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn store_err(req: &Request, e: StoreError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}

/// Reload the collection from the store and republish the view snapshot.
/// Used after every successful write so projections stay consistent.
fn refresh_snapshot(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return Some(e),
    };
    match records::fetch_all_records(conn) {
        Ok(all) => {
            state.view.set_records(all);
            None
        }
        Err(e) => Some(store_err(req, e)),
    }
}

fn records_json(items: &[&records::ClassRecord]) -> serde_json::Value {
    json!(items)
}

fn handle_records_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // The one fetch of the view session. On failure the current snapshot
    // (possibly empty) is kept; the caller decides whether to retry.
    match records::fetch_all_records(conn) {
        Ok(all) => {
            let count = all.len();
            state.view.set_records(all);
            ok(
                &req.id,
                json!({ "records": state.view.records(), "count": count }),
            )
        }
        Err(e) => {
            log::warn!("records.open failed: {}", e.message);
            store_err(req, e)
        }
    }
}

fn handle_records_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "records": state.view.records(),
            "count": state.view.records().len()
        }),
    )
}

fn handle_records_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match required_str(req, "query") {
        Ok(v) => v,
        Err(e) => return e,
    };
    state.view.set_query(query);
    let filtered = state.view.filtered();
    ok(
        &req.id,
        json!({
            "query": state.view.query(),
            "records": records_json(&filtered),
            "count": filtered.len()
        }),
    )
}

fn handle_records_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let new: NewRecord = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let created = {
        let conn = match db_conn(state, req) {
            Ok(v) => v,
            Err(e) => return e,
        };
        match records::insert_record(conn, &new) {
            Ok(v) => v,
            Err(e) => return store_err(req, e),
        }
    };
    if let Some(e) = refresh_snapshot(state, req) {
        return e;
    }
    ok(&req.id, json!({ "record": created }))
}

fn handle_records_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch: RecordPatch = match req.params.get("patch") {
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
        },
        None => return err(&req.id, "bad_params", "missing patch", None),
    };
    let updated = {
        let conn = match db_conn(state, req) {
            Ok(v) => v,
            Err(e) => return e,
        };
        match records::update_record(conn, &class_id, &patch) {
            Ok(v) => v,
            Err(e) => return store_err(req, e),
        }
    };
    if let Some(e) = refresh_snapshot(state, req) {
        return e;
    }
    ok(&req.id, json!({ "record": updated }))
}

fn handle_attendance_append(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entry = StudentAttendance {
        student_name: match required_str(req, "studentName") {
            Ok(v) => v,
            Err(e) => return e,
        },
        student_id: match required_str(req, "studentId") {
            Ok(v) => v,
            Err(e) => return e,
        },
        attendance_time: match required_str(req, "attendanceTime") {
            Ok(v) => v,
            Err(e) => return e,
        },
    };
    let updated = {
        let conn = match db_conn(state, req) {
            Ok(v) => v,
            Err(e) => return e,
        };
        match records::append_attendance(conn, &class_id, &entry) {
            Ok(v) => v,
            Err(e) => return store_err(req, e),
        }
    };
    if let Some(e) = refresh_snapshot(state, req) {
        return e;
    }
    ok(&req.id, json!({ "record": updated }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.open" => Some(handle_records_open(state, req)),
        "records.list" => Some(handle_records_list(state, req)),
        "records.search" => Some(handle_records_search(state, req)),
        "records.create" => Some(handle_records_create(state, req)),
        "records.update" => Some(handle_records_update(state, req)),
        "attendance.append" => Some(handle_attendance_append(state, req)),
        _ => None,
    }
}
