use serde::Serialize;

use crate::filter;
use crate::records::ClassRecord;

/// The modal view layered above the base record listing. Exactly one overlay
/// is active at a time; `Listing` is the implicit base everything returns to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "overlay", rename_all = "camelCase")]
pub enum Overlay {
    Listing,
    #[serde(rename_all = "camelCase")]
    Viewing {
        class_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Editing {
        class_id: String,
    },
    #[serde(rename_all = "camelCase")]
    RecordingAttendance {
        class_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewError {
    pub code: String,
    pub message: String,
}

impl ViewError {
    fn invalid_state(message: impl Into<String>) -> Self {
        Self {
            code: "invalid_state".to_string(),
            message: message.into(),
        }
    }
}

/// Long-lived console view state: the read-mostly record snapshot, the live
/// search query, and the overlay machine. The filtered listing and the
/// selected record are projections recomputed from these inputs on demand;
/// they carry no identity of their own.
#[derive(Debug, Default)]
pub struct ConsoleView {
    records: Vec<ClassRecord>,
    query: String,
    selected: Option<String>,
    overlay: Option<Overlay>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a fresh snapshot. Selection is re-resolved against the new
    /// collection; a selected record that disappeared is dropped.
    pub fn set_records(&mut self, records: Vec<ClassRecord>) {
        self.records = records;
        if let Some(id) = &self.selected {
            if !self.records.iter().any(|r| &r.class_id == id) {
                log::warn!("selected record {} no longer in collection", id);
                self.selected = None;
                self.overlay = None;
            }
        }
    }

    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    pub fn set_query(&mut self, query: String) {
        self.query = query;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The filtered listing, recomputed from the snapshot and query.
    pub fn filtered(&self) -> Vec<&ClassRecord> {
        filter::filter_records(&self.records, &self.query)
    }

    pub fn selected_record(&self) -> Option<&ClassRecord> {
        let id = self.selected.as_deref()?;
        self.records.iter().find(|r| r.class_id == id)
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay.clone().unwrap_or(Overlay::Listing)
    }

    /// Select a record by id and open the document view. An unknown id is a
    /// silent no-op: state is left exactly as it was.
    pub fn select_for_view(&mut self, class_id: &str) -> bool {
        if !self.records.iter().any(|r| r.class_id == class_id) {
            log::warn!("view.open ignored: unknown classId {}", class_id);
            return false;
        }
        self.selected = Some(class_id.to_string());
        self.overlay = Some(Overlay::Viewing {
            class_id: class_id.to_string(),
        });
        true
    }

    /// Open the edit overlay for the current selection.
    pub fn open_edit(&mut self) -> Result<(), ViewError> {
        let Some(id) = self.selected.clone() else {
            return Err(ViewError::invalid_state("no record selected"));
        };
        self.overlay = Some(Overlay::Editing { class_id: id });
        Ok(())
    }

    /// Manual attendance is a sub-overlay of the edit view.
    pub fn open_manual_attendance(&mut self) -> Result<(), ViewError> {
        match &self.overlay {
            Some(Overlay::Editing { class_id }) => {
                self.overlay = Some(Overlay::RecordingAttendance {
                    class_id: class_id.clone(),
                });
                Ok(())
            }
            _ => Err(ViewError::invalid_state(
                "manual attendance requires the edit view",
            )),
        }
    }

    /// Close the active overlay. The attendance sub-overlay pops back to the
    /// edit view; everything else returns to the listing. Selection survives,
    /// it is only a projection over the snapshot.
    pub fn close(&mut self) {
        self.overlay = match self.overlay.take() {
            Some(Overlay::RecordingAttendance { class_id }) => {
                Some(Overlay::Editing { class_id })
            }
            _ => None,
        };
    }
}
