use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn state_json(state: &AppState) -> serde_json::Value {
    json!({
        "overlay": state.view.overlay(),
        "selectedClassId": state.view.selected_record().map(|r| r.class_id.clone()),
        "query": state.view.query(),
    })
}

fn handle_view_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, state_json(state))
}

fn handle_view_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };
    // An unknown id is a no-op, not an error: the listing stays as it was
    // and the response carries the unchanged state.
    let selected = state.view.select_for_view(&class_id);
    let mut payload = state_json(state);
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("selected".to_string(), json!(selected));
    }
    ok(&req.id, payload)
}

fn handle_view_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.view.open_edit() {
        Ok(()) => ok(&req.id, state_json(state)),
        Err(e) => err(&req.id, &e.code, e.message, None),
    }
}

fn handle_view_manual_attendance(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.view.open_manual_attendance() {
        Ok(()) => ok(&req.id, state_json(state)),
        Err(e) => err(&req.id, &e.code, e.message, None),
    }
}

fn handle_view_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.view.close();
    ok(&req.id, state_json(state))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "view.state" => Some(handle_view_state(state, req)),
        "view.open" => Some(handle_view_open(state, req)),
        "view.edit" => Some(handle_view_edit(state, req)),
        "view.manualAttendance" => Some(handle_view_manual_attendance(state, req)),
        "view.close" => Some(handle_view_close(state, req)),
        _ => None,
    }
}
