use eframe::egui;
use std::sync::{Mutex, OnceLock};

use crate::models::AttendeeDetails;
use crate::services::submission_flow::SubmissionPhase;

pub enum FormAction {
    Stay,
    Validate(String),
    Submit(AttendeeDetails),
}

enum FormMessage {
    Info(String),
    Error(String),
}

#[derive(Default)]
struct FormUiState {
    details: AttendeeDetails,
    message: Option<FormMessage>,
}

static FORM_UI_STATE: OnceLock<Mutex<FormUiState>> = OnceLock::new();

fn form_ui_state() -> &'static Mutex<FormUiState> {
    FORM_UI_STATE.get_or_init(|| Mutex::new(FormUiState::default()))
}

fn with_state(action: impl FnOnce(&mut FormUiState)) {
    let mut state = form_ui_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    action(&mut state);
}

pub fn report_info(message: impl Into<String>) {
    let message = message.into();
    with_state(|state| state.message = Some(FormMessage::Info(message)));
}

pub fn report_error(message: impl Into<String>) {
    let message = message.into();
    with_state(|state| state.message = Some(FormMessage::Error(message)));
}

/// Empties every field after a confirmed submission.
pub fn clear_fields() {
    with_state(|state| state.details = AttendeeDetails::default());
}

fn phase_label(phase: &SubmissionPhase) -> String {
    match phase {
        SubmissionPhase::ValidatingCode { event_code } => format!("Validating {event_code}..."),
        SubmissionPhase::AwaitingLocation { .. } => "Getting your location...".to_string(),
        SubmissionPhase::ResolvingPlaceName { fix, .. } => format!(
            "Looking up place name for {:.4}, {:.4}...",
            fix.latitude, fix.longitude
        ),
        SubmissionPhase::Sending { fix, .. } => match &fix.resolved_name {
            Some(name) => format!("Submitting attendance from {name}..."),
            None => "Submitting attendance...".to_string(),
        },
        _ => String::new(),
    }
}

pub fn ui(ui: &mut egui::Ui, phase: &SubmissionPhase) -> FormAction {
    ui.heading("Attendance Registration");
    ui.add_space(12.0);

    let mut state = form_ui_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let busy = phase.is_busy();

    ui.label("Event code");
    ui.horizontal(|ui| {
        ui.add_enabled(
            !busy,
            egui::TextEdit::singleline(&mut state.details.event_code)
                .hint_text("e.g. E00001")
                .desired_width(300.0),
        );
    });

    let typed_code = state.details.event_code.trim().to_string();
    let code_validated = phase.validated_code() == Some(typed_code.as_str());

    let mut action = FormAction::Stay;
    if ui
        .add_enabled(!busy && !typed_code.is_empty(), egui::Button::new("Validate"))
        .clicked()
    {
        state.message = None;
        action = FormAction::Validate(typed_code.clone());
    }
    ui.add_space(10.0);

    ui.add_enabled_ui(code_validated && !busy, |ui| {
        ui.label("Name");
        ui.add_sized(
            [420.0, 28.0],
            egui::TextEdit::singleline(&mut state.details.user_name),
        );
        ui.add_space(6.0);

        ui.label("Phone number");
        ui.add_sized(
            [420.0, 28.0],
            egui::TextEdit::singleline(&mut state.details.phone_number).char_limit(10),
        );
        ui.add_space(6.0);

        ui.label("Organisation");
        ui.add_sized(
            [420.0, 28.0],
            egui::TextEdit::singleline(&mut state.details.org_name),
        );
        ui.add_space(10.0);

        if ui.button("Submit").clicked() {
            state.message = None;
            action = FormAction::Submit(state.details.clone());
        }
    });

    if busy {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label(phase_label(phase));
        });
    }

    match &state.message {
        Some(FormMessage::Info(message)) => {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::LIGHT_GREEN, message);
        }
        Some(FormMessage::Error(message)) => {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::LIGHT_RED, message);
        }
        None => {}
    }

    action
}
