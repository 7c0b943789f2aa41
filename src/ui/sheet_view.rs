//! Editable cell grid for the open spreadsheet

use eframe::egui;
use egui_extras::{Column, TableBuilder};

use crate::core::config::UiConfig;
use crate::core::document::{column_name, SpreadsheetDocument};

const ROW_HEIGHT: f32 = 22.0;

/// Sheet grid panel
pub struct SheetView;

impl SheetView {
    /// Show sheet tabs and the cell grid of the active sheet
    pub fn show(ui: &mut egui::Ui, document: &mut SpreadsheetDocument, config: &UiConfig) {
        let names = document.sheet_names();
        if names.len() > 1 {
            Self::show_tabs(ui, document, &names);
            ui.separator();
        }

        // Show the used range plus some empty room to type into
        let (used_cols, used_rows) = document.used_extent();
        let cols = used_cols.max(config.visible_columns).max(1);
        let rows = used_rows.max(config.visible_rows).max(1);

        egui::ScrollArea::horizontal()
            .id_salt("sheet_scroll")
            .show(ui, |ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .column(Column::exact(40.0))
                    .columns(
                        Column::initial(90.0).at_least(40.0).resizable(true),
                        cols as usize,
                    )
                    .header(ROW_HEIGHT, |mut header| {
                        header.col(|_ui| {});
                        for col in 1..=cols {
                            header.col(|ui| {
                                ui.strong(column_name(col));
                            });
                        }
                    })
                    .body(|body| {
                        body.rows(ROW_HEIGHT, rows as usize, |mut row| {
                            let row_num = row.index() as u32 + 1;
                            row.col(|ui| {
                                ui.label(row_num.to_string());
                            });
                            for col in 1..=cols {
                                row.col(|ui| {
                                    let mut value = document.cell_value(col, row_num);
                                    let response = ui.add(
                                        egui::TextEdit::singleline(&mut value)
                                            .desired_width(f32::INFINITY),
                                    );
                                    if response.changed() {
                                        document.set_cell_value(col, row_num, &value);
                                    }
                                });
                            }
                        });
                    });
            });
    }

    fn show_tabs(ui: &mut egui::Ui, document: &mut SpreadsheetDocument, names: &[String]) {
        ui.horizontal(|ui| {
            for (index, name) in names.iter().enumerate() {
                let is_active = document.active_sheet() == index;
                if ui.selectable_label(is_active, name).clicked() {
                    document.set_active_sheet(index);
                }
            }
        });
    }
}
