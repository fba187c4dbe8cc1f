use eframe::egui;

use crate::services::submission_flow::SubmissionPhase;

pub enum ConfirmationAction {
    Stay,
    Acknowledge,
}

pub fn ui(ui: &mut egui::Ui, phase: &SubmissionPhase) -> ConfirmationAction {
    match phase {
        SubmissionPhase::Success {
            event_code,
            message,
            token,
        } => {
            ui.heading("Attendance Submitted");
            ui.add_space(8.0);
            ui.label(format!("Event: {event_code}"));
            ui.label(message);
            ui.add_space(12.0);
            egui::Frame::group(ui.style())
                .fill(egui::Color32::from_rgb(22, 58, 30))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 180, 90)))
                .show(ui, |ui| {
                    ui.label(egui::RichText::new("Your token").strong());
                    ui.label(egui::RichText::new(token).size(40.0).monospace());
                });
        }
        SubmissionPhase::Failure { message } => {
            ui.heading("Submission Failed");
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::from_rgb(255, 170, 170), message);
        }
        _ => return ConfirmationAction::Stay,
    }

    ui.add_space(16.0);
    if ui.button("OK").clicked() {
        return ConfirmationAction::Acknowledge;
    }
    ConfirmationAction::Stay
}
