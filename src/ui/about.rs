//! Welcome screen shown while no spreadsheet is open

use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};

const ABOUT: &str = "\
# Welcome to e-xell!

This is not a good app, don't use it for anything real.

This is demo app. Check the [GitHub page](https://github.com/mstahv/e-xell) why this app exists.

Create a new spreadsheet, open an `.xlsx` file, or open a file you stored earlier in
local storage.

Keyboard shortcuts:

- `Ctrl+N` - New
- `Ctrl+O` - Open from disk
- `Ctrl+S` - Save to disk
- `Ctrl+W` - Close
";

/// About panel
pub struct AboutPanel;

impl AboutPanel {
    pub fn show(ui: &mut egui::Ui, cache: &mut CommonMarkCache) {
        egui::ScrollArea::vertical()
            .id_salt("about_scroll")
            .show(ui, |ui| {
                ui.add_space(20.0);
                CommonMarkViewer::new().show(ui, cache, ABOUT);
            });
    }
}
