//! UI components for e-xell

pub mod about;
pub mod notifications;
pub mod picker_dialog;
pub mod sheet_view;
pub mod toolbar;
