//! Modal dialog rendering a [`FilePicker`]

use eframe::egui;

use crate::core::picker::FilePicker;
use crate::core::registry::FilenameRegistry;
use super::notifications::Notifications;

/// Filename picker dialog
pub struct PickerDialog;

impl PickerDialog {
    /// Show the picker modal. Returns `false` once the dialog should go away, either
    /// because a name was picked or because the user dismissed it.
    pub fn show(
        ctx: &egui::Context,
        picker: &mut FilePicker,
        registry: &FilenameRegistry,
        notifications: &mut Notifications,
    ) -> bool {
        let loaded = picker.poll();

        let response = egui::Modal::new(egui::Id::new("file_picker")).show(ctx, |ui| {
            ui.set_width(320.0);
            ui.heading(picker.existing_heading());

            if !loaded {
                ui.spinner();
                ctx.request_repaint();
                return;
            }

            Self::show_existing(ui, picker);

            if let Some(heading) = picker.new_name_heading() {
                ui.add_space(8.0);
                ui.heading(heading);
                Self::show_new_name(ui, picker, registry, notifications);
            }
        });

        !response.should_close() && !picker.is_resolved()
    }

    fn show_existing(ui: &mut egui::Ui, picker: &mut FilePicker) {
        if let Some(error) = picker.load_error() {
            let color = ui.visuals().error_fg_color;
            ui.colored_label(color, format!("Could not read stored files: {}", error));
            return;
        }

        let files = picker.files().map(<[String]>::to_vec).unwrap_or_default();
        if files.is_empty() {
            ui.label("No stored files yet");
            return;
        }

        let mut chosen = None;
        egui::ComboBox::from_id_salt("existing_files")
            .selected_text("Pick existing")
            .width(280.0)
            .show_ui(ui, |ui| {
                for file in &files {
                    if ui.selectable_label(false, file).clicked() {
                        chosen = Some(file.clone());
                    }
                }
            });

        if let Some(name) = chosen {
            picker.choose_existing(&name);
        }
    }

    fn show_new_name(
        ui: &mut egui::Ui,
        picker: &mut FilePicker,
        registry: &FilenameRegistry,
        notifications: &mut Notifications,
    ) {
        ui.horizontal(|ui| {
            let edit = ui.add(
                egui::TextEdit::singleline(&mut picker.new_name).hint_text("letters and digits"),
            );
            let can_confirm = picker.can_confirm_new();
            let confirm = ui
                .add_enabled(can_confirm, egui::Button::new("\u{27A1}"))
                .on_hover_text("Use this name");
            let entered = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            if confirm.clicked() || (entered && can_confirm) {
                if let Err(e) = picker.confirm_new(registry) {
                    tracing::error!("Failed to register file name: {}", e);
                    notifications.error(format!("Could not register file name: {}", e));
                }
            }
        });
    }
}
