//! Main application state and UI coordination

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;

use crate::core::codec::StorageCodec;
use crate::core::config::AppConfig;
use crate::core::controller::{DocumentController, StoredOpen, ToolbarAction};
use crate::core::document::DocumentError;
use crate::core::error::{ExellError, Result};
use crate::core::picker::{FilePicker, PendingPick};
use crate::core::registry::FilenameRegistry;
use crate::core::web_storage::{DirectoryStorage, ItemRead, MemoryStorage, PendingRead, WebStorage};
use crate::ui::{
    about::AboutPanel,
    notifications::{display_size, Notifications},
    picker_dialog::PickerDialog,
    sheet_view::SheetView,
    toolbar::ToolbarPanel,
};

/// File types accepted by "Open from disk"
pub const ACCEPTED_FILE_TYPES: [&str; 3] = [".xls", ".xlsx", "application/vnd.ms-excel"];

/// A storage flow waiting on the user or on a storage read
enum PendingFlow {
    /// Waiting for the name to save under
    Save(PendingPick),
    /// Waiting for the name to open
    OpenPick(PendingPick),
    /// Waiting for the stored payload
    OpenRead {
        name: String,
        read: PendingRead<ItemRead>,
    },
}

/// Main application state
pub struct ExellApp {
    /// Application configuration
    pub config: AppConfig,
    /// Document handle and toolbar state
    pub controller: DocumentController,
    /// Filename registry on top of the web storage
    registry: FilenameRegistry,
    /// Runtime serving asynchronous storage reads
    _runtime: Option<tokio::runtime::Runtime>,
    /// Open filename picker, if any
    pub picker: Option<FilePicker>,
    pending: Option<PendingFlow>,
    /// User notifications
    pub notifications: Notifications,
    /// Commonmark cache for the about screen
    pub commonmark_cache: egui_commonmark::CommonMarkCache,
}

impl ExellApp {
    /// Create a new application instance
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            AppConfig::default()
        });

        if config.light_theme() {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        }

        let (storage, runtime) = Self::open_storage(&config);
        Self::with_storage(config, storage, runtime)
    }

    /// Create the application on top of an explicit store
    pub fn with_storage(
        config: AppConfig,
        storage: Arc<dyn WebStorage>,
        runtime: Option<tokio::runtime::Runtime>,
    ) -> Self {
        let codec = StorageCodec::new(config.storage.compression_level);
        let ttl = Duration::from_secs(config.ui.notification_seconds);

        Self {
            controller: DocumentController::new(codec),
            registry: FilenameRegistry::new(storage),
            _runtime: runtime,
            picker: None,
            pending: None,
            notifications: Notifications::new(ttl),
            commonmark_cache: egui_commonmark::CommonMarkCache::default(),
            config,
        }
    }

    /// Directory-backed storage, or an in-memory store if no runtime can be started
    fn open_storage(config: &AppConfig) -> (Arc<dyn WebStorage>, Option<tokio::runtime::Runtime>) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("exell-storage")
            .build();

        match runtime {
            Ok(runtime) => {
                let dir = config.storage_dir();
                tracing::info!("Using web storage at: {}", dir.display());
                let storage = DirectoryStorage::new(dir, runtime.handle().clone());
                (Arc::new(storage), Some(runtime))
            }
            Err(e) => {
                tracing::error!("Failed to start storage runtime, storage is not persistent: {}", e);
                (Arc::new(MemoryStorage::new()), None)
            }
        }
    }

    /// Whether a pick or storage read is in flight
    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || self.picker.is_some()
    }

    /// Run a toolbar action
    pub fn handle_action(&mut self, action: ToolbarAction) {
        if self.is_busy() {
            tracing::debug!("Ignoring {} while a file pick is in progress", action);
            return;
        }

        let result = match action {
            ToolbarAction::New => self.controller.new_document(),
            ToolbarAction::OpenFromDisk => self.open_from_disk(),
            ToolbarAction::OpenFromStorage => self.begin_open_from_storage(),
            ToolbarAction::SaveToDisk => self.save_to_disk(),
            ToolbarAction::SaveToStorage => self.begin_save_to_storage(),
            ToolbarAction::Close => self.controller.close(),
        };

        if let Err(e) = result {
            self.report(action, e);
        }
    }

    fn report(&mut self, action: ToolbarAction, error: ExellError) {
        tracing::error!("{} failed: {}", action, error);
        self.notifications.error(format!("{} failed: {}", action, error));
    }

    fn open_from_disk(&mut self) -> Result<()> {
        self.controller.ensure_enabled(ToolbarAction::OpenFromDisk)?;
        let extensions = upload_extensions();
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Excel", extensions.as_slice())
            .pick_file()
        else {
            return Ok(());
        };

        let file = File::open(&path).map_err(DocumentError::from)?;
        self.controller.open_reader(BufReader::new(file))
    }

    fn save_to_disk(&mut self) -> Result<()> {
        self.controller.ensure_enabled(ToolbarAction::SaveToDisk)?;
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(&self.config.download_file_name)
            .add_filter("Excel", &["xlsx"])
            .save_file()
        else {
            return Ok(());
        };

        self.controller.save_to_path(&path)?;
        self.notifications.info(format!("Saved {}", path.display()));
        Ok(())
    }

    /// Ask for a name to store the open spreadsheet under
    pub fn begin_save_to_storage(&mut self) -> Result<()> {
        self.controller.ensure_enabled(ToolbarAction::SaveToStorage)?;
        let (picker, pick) = FilePicker::pick_new_or_existing(&self.registry);
        self.picker = Some(picker);
        self.pending = Some(PendingFlow::Save(pick));
        Ok(())
    }

    /// Ask which stored spreadsheet to open
    pub fn begin_open_from_storage(&mut self) -> Result<()> {
        self.controller.ensure_enabled(ToolbarAction::OpenFromStorage)?;
        let (picker, pick) = FilePicker::pick_existing(&self.registry);
        self.picker = Some(picker);
        self.pending = Some(PendingFlow::OpenPick(pick));
        Ok(())
    }

    /// Advance storage flows whose pick or read has completed
    pub fn poll_pending(&mut self) {
        if self.picker.as_ref().is_some_and(FilePicker::is_resolved) {
            self.picker = None;
        }

        let Some(flow) = self.pending.take() else {
            return;
        };

        self.pending = match flow {
            PendingFlow::Save(mut pick) => match pick.try_take() {
                None => Some(PendingFlow::Save(pick)),
                Some(Some(name)) => {
                    self.finish_save_to_storage(&name);
                    None
                }
                Some(None) => None,
            },
            PendingFlow::OpenPick(mut pick) => match pick.try_take() {
                None => Some(PendingFlow::OpenPick(pick)),
                Some(Some(name)) => {
                    let read = self.registry.storage().get_item(&name);
                    Some(PendingFlow::OpenRead { name, read })
                }
                Some(None) => None,
            },
            PendingFlow::OpenRead { name, mut read } => match read.try_take() {
                None => Some(PendingFlow::OpenRead { name, read }),
                Some(Ok(payload)) => {
                    self.finish_open_from_storage(&name, payload.as_deref());
                    None
                }
                Some(Err(e)) => {
                    self.report(ToolbarAction::OpenFromStorage, e.into());
                    None
                }
            },
        };
    }

    fn finish_save_to_storage(&mut self, name: &str) {
        let storage = Arc::clone(self.registry.storage());
        match self.controller.save_to_storage(storage.as_ref(), name) {
            Ok(len) => self.notifications.info(format!(
                "Saved {} to your local storage.",
                display_size(len)
            )),
            Err(e) => self.report(ToolbarAction::SaveToStorage, e),
        }
    }

    fn finish_open_from_storage(&mut self, name: &str, payload: Option<&str>) {
        match self.controller.open_stored_payload(payload) {
            Ok(StoredOpen::Opened) => {}
            Ok(StoredOpen::NothingStored) => {
                tracing::info!("Nothing stored under '{}'", name);
                self.notifications.info(format!("Nothing is stored under '{}'.", name));
            }
            Err(e) => self.report(ToolbarAction::OpenFromStorage, e),
        }
    }

    /// Keyboard shortcuts for enabled actions
    fn shortcut_action(&self, ctx: &egui::Context) -> Option<ToolbarAction> {
        let toolbar = self.controller.toolbar();
        let pressed = ctx.input(|i| {
            if !i.modifiers.ctrl {
                return None;
            }
            if i.key_pressed(egui::Key::N) {
                Some(ToolbarAction::New)
            } else if i.key_pressed(egui::Key::O) {
                Some(ToolbarAction::OpenFromDisk)
            } else if i.key_pressed(egui::Key::S) {
                Some(ToolbarAction::SaveToDisk)
            } else if i.key_pressed(egui::Key::W) {
                Some(ToolbarAction::Close)
            } else {
                None
            }
        });
        pressed.filter(|action| toolbar.is_enabled(*action))
    }
}

/// Extensions usable in a native file dialog filter
fn upload_extensions() -> Vec<&'static str> {
    ACCEPTED_FILE_TYPES
        .iter()
        .filter_map(|t| t.strip_prefix('.'))
        .collect()
}

impl eframe::App for ExellApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_pending();
        self.notifications.prune(Instant::now());

        let mut action = if self.is_busy() {
            None
        } else {
            self.shortcut_action(ctx)
        };

        // Render toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_enabled_ui(!self.is_busy(), |ui| {
                if let Some(clicked) = ToolbarPanel::show(ui, self.controller.toolbar()) {
                    action = Some(clicked);
                }
            });
        });

        if let Some(action) = action {
            self.handle_action(action);
        }

        self.notifications.show(ctx);

        // Render main content area
        egui::CentralPanel::default().show(ctx, |ui| match self.controller.document_mut() {
            Some(document) => SheetView::show(ui, document, &self.config.ui),
            None => AboutPanel::show(ui, &mut self.commonmark_cache),
        });

        let keep_picker = self.picker.as_mut().map(|picker| {
            PickerDialog::show(ctx, picker, &self.registry, &mut self.notifications)
        });
        if keep_picker == Some(false) {
            self.picker = None;
        }

        if self.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}
