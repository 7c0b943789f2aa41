//! Toolbar with the six document actions

use eframe::egui;

use crate::core::controller::{ToolbarAction, ToolbarState};

/// Toolbar panel
pub struct ToolbarPanel;

impl ToolbarPanel {
    /// Show the toolbar and return the action clicked this frame, if any
    pub fn show(ui: &mut egui::Ui, toolbar: ToolbarState) -> Option<ToolbarAction> {
        let mut clicked = None;

        ui.horizontal(|ui| {
            for action in ToolbarAction::ALL {
                let response = ui
                    .add_enabled(toolbar.is_enabled(action), egui::Button::new(action.label()))
                    .on_hover_text(action.tooltip())
                    .on_disabled_hover_text(action.tooltip());
                if response.clicked() {
                    clicked = Some(action);
                }
            }
        });

        clicked
    }
}
