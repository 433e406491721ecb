use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

/// Resolve the record the report is about: an explicit classId wins,
/// otherwise the current selection. Neither resolving is fine; the
/// generator renders a placeholder document for an absent record.
fn resolve_record<'a>(state: &'a AppState, req: &Request) -> Option<&'a crate::records::ClassRecord> {
    match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(id) => state.view.records().iter().find(|r| r.class_id == id),
        None => state.view.selected_record(),
    }
}

fn handle_session_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    let doc = report::render(resolve_record(state, req));
    let content = String::from_utf8_lossy(&doc.to_bytes()).to_string();
    let filename = doc.suggested_filename.clone();
    ok(
        &req.id,
        json!({
            "document": doc,
            "content": content,
            "suggestedFilename": filename,
        }),
    )
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) => PathBuf::from(v),
        None => return err(&req.id, "bad_params", "missing outPath", None),
    };

    let doc = report::render(resolve_record(state, req));
    let bytes = doc.to_bytes();

    let write_result = (|| -> std::io::Result<()> {
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut f = std::fs::File::create(&out_path)?;
        f.write_all(&bytes)?;
        f.flush()
    })();
    if let Err(e) = write_result {
        return err(
            &req.id,
            "export_failed",
            e.to_string(),
            Some(json!({ "outPath": out_path.to_string_lossy() })),
        );
    }

    ok(
        &req.id,
        json!({
            "outPath": out_path.to_string_lossy(),
            "suggestedFilename": doc.suggested_filename,
            "byteCount": bytes.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.sessionModel" => Some(handle_session_model(state, req)),
        "reports.export" => Some(handle_export(state, req)),
        _ => None,
    }
}
