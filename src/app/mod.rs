//! GTK 4 desktop shell around the workflow.
//!
//! All state lives in one [`Workflow`]; widgets only forward user input to it
//! and a periodic tick pumps recognition messages, expires toasts and
//! re-renders.

mod paste;
mod view;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use gtk4::prelude::*;
use gtk4::{gdk, gio, glib};
use gtk4::{
    Application, ApplicationWindow, DropTarget, EventControllerKey, FileChooserAction,
    FileChooserNative, FileFilter, Overlay, ResponseType, Stack,
    StackTransitionType,
};

use crate::acquisition::ACCEPTED_MIME_TYPES;
use crate::actions::{copy_to_clipboard, download_as_file};
use crate::bootstrap::LoadingSequence;
use crate::clipboard::{ClipboardBackend, FallbackBackend, GdkClipboardBackend, WlCopyBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::{load_app_config, AppConfig};
use crate::error::{AppError, AppResult};
use crate::notification::DesktopSink;
use crate::ocr::OcrEngine;
use crate::storage::{DownloadsExporter, TextExporter};
use crate::workflow::{ThreadSpawner, Workflow, WorkflowOptions};

use self::view::{toast_row, LoadingView, MainView};

const APP_ID: &str = "io.github.snaptext";
const UI_TICK_INTERVAL: Duration = Duration::from_millis(100);
const PAGE_LOADING: &str = "loading";
const PAGE_MAIN: &str = "main";

type SharedWorkflow = Rc<RefCell<Workflow>>;

/// Everything the signal handlers need.
struct Shell {
    workflow: SharedWorkflow,
    view: MainView,
    clipboard: Box<dyn ClipboardBackend>,
    exporter: Box<dyn TextExporter>,
    file_chooser: RefCell<Option<FileChooserNative>>,
}

impl Shell {
    fn render(self: &Rc<Self>) {
        let toasts_changed = self.view.refresh(&self.workflow.borrow());
        if toasts_changed {
            self.render_toasts();
        }
    }

    fn render_toasts(self: &Rc<Self>) {
        let toast_box = &self.view.toast_box;
        while let Some(child) = toast_box.first_child() {
            toast_box.remove(&child);
        }

        let workflow = self.workflow.borrow();
        for notification in workflow.notifications().iter() {
            let (row, close) = toast_row(&notification.message, notification.severity);
            let shell = Rc::clone(self);
            let id = notification.id;
            close.connect_clicked(move |_| {
                shell.workflow.borrow_mut().notifications_mut().dismiss(id);
                shell.render();
            });
            toast_box.append(&row);
        }
    }

    fn acquire_dropped(self: &Rc<Self>, paths: Vec<PathBuf>) {
        // Rejections are already reported according to the feedback policy.
        let _ = self.workflow.borrow_mut().acquire_dropped_paths(paths);
        self.render();
    }

    fn acquire_picked(self: &Rc<Self>, path: PathBuf) {
        let _ = self.workflow.borrow_mut().acquire_picked(&path);
        self.render();
    }

    fn open_file_chooser(self: &Rc<Self>, window: &ApplicationWindow) {
        if self.file_chooser.borrow().is_some() {
            return;
        }
        let chooser = FileChooserNative::new(
            Some("Open Image"),
            Some(window),
            FileChooserAction::Open,
            Some("_Open"),
            Some("_Cancel"),
        );
        let filter = FileFilter::new();
        filter.set_name(Some("Images"));
        for mime_type in ACCEPTED_MIME_TYPES {
            filter.add_mime_type(mime_type);
        }
        chooser.add_filter(&filter);

        let shell = Rc::clone(self);
        chooser.connect_response(move |dialog, response| {
            if response == ResponseType::Accept {
                if let Some(path) = dialog.file().and_then(|file| file.path()) {
                    shell.acquire_picked(path);
                }
            }
            shell.file_chooser.borrow_mut().take();
        });
        chooser.show();
        self.file_chooser.borrow_mut().replace(chooser);
    }

    fn paste_from_clipboard(self: &Rc<Self>) {
        let Some(display) = gdk::Display::default() else {
            tracing::warn!("no display available for paste");
            return;
        };
        let shell = Rc::clone(self);
        display
            .clipboard()
            .read_texture_async(None::<&gio::Cancellable>, move |result| {
                let items = match result {
                    Ok(Some(texture)) => paste::texture_to_clipboard_item(&texture)
                        .into_iter()
                        .collect(),
                    Ok(None) => Vec::new(),
                    Err(err) => {
                        tracing::debug!(%err, "clipboard holds no image");
                        Vec::new()
                    }
                };
                let _ = shell.workflow.borrow_mut().acquire_pasted(items);
                shell.render();
            });
    }

    fn extract(self: &Rc<Self>) {
        self.workflow.borrow_mut().start_recognition();
        self.render();
    }

    fn clear(self: &Rc<Self>) {
        self.workflow.borrow_mut().clear();
        self.render();
    }

    fn copy(self: &Rc<Self>) {
        let _ = copy_to_clipboard(&mut self.workflow.borrow_mut(), self.clipboard.as_ref());
        self.render();
    }

    fn save(self: &Rc<Self>) {
        let _ = download_as_file(&mut self.workflow.borrow_mut(), self.exporter.as_ref());
        self.render();
    }
}

fn build_workflow(
    config: &AppConfig,
    engine: Arc<dyn OcrEngine>,
    clock: Arc<dyn Clock>,
) -> Workflow {
    let options = WorkflowOptions::from_config(config);
    tracing::info!(
        language = options.language.display_name(),
        max_upload_bytes = options.max_upload_bytes,
        rejection_feedback = ?options.rejection_feedback,
        "workflow configured"
    );
    let mut workflow = Workflow::new(engine, Box::new(ThreadSpawner), clock, options);
    if config.desktop_notifications {
        workflow.notifications_mut().set_sink(Box::new(DesktopSink));
    }
    workflow
}

/// On Wayland `wl-copy` keeps the text available after the window closes.
fn build_clipboard() -> Box<dyn ClipboardBackend> {
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        Box::new(FallbackBackend::new(WlCopyBackend, GdkClipboardBackend))
    } else {
        Box::new(GdkClipboardBackend)
    }
}

fn build_exporter(config: &AppConfig) -> DownloadsExporter {
    DownloadsExporter::with_default_dir(config.download_dir.as_deref()).unwrap_or_else(|err| {
        tracing::warn!(%err, "no downloads directory; saving to temp dir");
        DownloadsExporter::with_dir(std::env::temp_dir())
    })
}

fn build_window(app: &Application, config: &AppConfig, engine: Arc<dyn OcrEngine>) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let shell = Rc::new(Shell {
        workflow: Rc::new(RefCell::new(build_workflow(
            config,
            engine,
            Arc::clone(&clock),
        ))),
        view: MainView::new(),
        clipboard: build_clipboard(),
        exporter: Box::new(build_exporter(config)),
        file_chooser: RefCell::new(None),
    });

    let loading_view = LoadingView::new();
    let overlay = Overlay::new();
    overlay.set_child(Some(&shell.view.root));
    overlay.add_overlay(&shell.view.toast_box);

    let stack = Stack::new();
    stack.set_transition_type(StackTransitionType::Crossfade);
    stack.add_named(&loading_view.root, Some(PAGE_LOADING));
    stack.add_named(&overlay, Some(PAGE_MAIN));
    stack.set_visible_child_name(PAGE_LOADING);

    let window = ApplicationWindow::builder()
        .application(app)
        .title("SnapText")
        .default_width(960)
        .default_height(760)
        .child(&stack)
        .build();

    let loading = {
        let stack = stack.clone();
        Rc::new(RefCell::new(LoadingSequence::start(
            Arc::clone(&clock),
            move || stack.set_visible_child_name(PAGE_MAIN),
        )))
    };
    loading_view.refresh(&loading.borrow());

    let drop_target = DropTarget::new(gdk::FileList::static_type(), gdk::DragAction::COPY);
    {
        let shell = Rc::clone(&shell);
        drop_target.connect_drop(move |_, value, _, _| {
            let Ok(list) = value.get::<gdk::FileList>() else {
                return false;
            };
            let paths = list.files().iter().filter_map(|file| file.path()).collect();
            shell.acquire_dropped(paths);
            true
        });
    }
    shell.view.drop_zone.add_controller(drop_target);

    {
        let browse_button = shell.view.browse_button.clone();
        let shell = Rc::clone(&shell);
        let window = window.clone();
        browse_button.connect_clicked(move |_| shell.open_file_chooser(&window));
    }

    let keys = EventControllerKey::new();
    {
        let shell = Rc::clone(&shell);
        keys.connect_key_pressed(move |_, key, _, modifiers| {
            let is_paste = modifiers.contains(gdk::ModifierType::CONTROL_MASK)
                && (key == gdk::Key::v || key == gdk::Key::V);
            if is_paste {
                shell.paste_from_clipboard();
                glib::Propagation::Stop
            } else {
                glib::Propagation::Proceed
            }
        });
    }
    window.add_controller(keys);

    connect_button(&shell, &shell.view.extract_button, Shell::extract);
    connect_button(&shell, &shell.view.clear_button, Shell::clear);
    connect_button(&shell, &shell.view.copy_button, Shell::copy);
    connect_button(&shell, &shell.view.save_button, Shell::save);

    {
        let shell = Rc::clone(&shell);
        glib::timeout_add_local(UI_TICK_INTERVAL, move || {
            {
                let mut loading = loading.borrow_mut();
                if !loading.is_complete() {
                    loading.tick();
                    loading_view.refresh(&loading);
                }
            }
            shell.workflow.borrow_mut().tick();
            shell.render();
            glib::ControlFlow::Continue
        });
    }

    shell.render();
    window.present();
}

fn connect_button(shell: &Rc<Shell>, button: &gtk4::Button, action: fn(&Rc<Shell>)) {
    let shell = Rc::clone(shell);
    button.connect_clicked(move |_| action(&shell));
}

/// Runs the GTK application until its last window closes.
pub fn run(engine: Arc<dyn OcrEngine>) -> AppResult<()> {
    let config = load_app_config();
    let app = Application::builder().application_id(APP_ID).build();
    app.connect_activate(move |app| build_window(app, &config, Arc::clone(&engine)));

    let exit_code = app.run_with_args(&Vec::<String>::new());
    if exit_code != glib::ExitCode::SUCCESS {
        return Err(AppError::Startup {
            message: format!("GTK application exited with {exit_code:?}"),
        });
    }
    Ok(())
}
