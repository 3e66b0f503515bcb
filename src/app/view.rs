use std::cell::RefCell;

use gtk4::gdk;
use gtk4::gdk_pixbuf::{Colorspace, Pixbuf};
use gtk4::glib;
use gtk4::prelude::*;
use gtk4::{
    Align, Box as GtkBox, Button, Frame, Label, Orientation, Picture, ProgressBar, ScrolledWindow,
    TextView, WrapMode,
};

use crate::acquisition::{UploadedImage, ACCEPTED_FORMAT_LABELS};
use crate::actions::text_statistics;
use crate::bootstrap::LoadingSequence;
use crate::notification::{NotificationId, Severity};
use crate::workflow::Workflow;

const PREVIEW_MAX_EDGE: u32 = 1024;

/// Widgets of the loading page.
pub(super) struct LoadingView {
    pub(super) root: GtkBox,
    progress: ProgressBar,
    label: Label,
}

impl LoadingView {
    pub(super) fn new() -> Self {
        let root = GtkBox::new(Orientation::Vertical, 16);
        root.set_valign(Align::Center);
        root.set_halign(Align::Center);

        let title = Label::new(Some("SnapText"));
        title.add_css_class("title-1");
        let label = Label::new(None);
        let progress = ProgressBar::new();
        progress.set_show_text(true);
        progress.set_width_request(320);

        root.append(&title);
        root.append(&progress);
        root.append(&label);
        Self {
            root,
            progress,
            label,
        }
    }

    pub(super) fn refresh(&self, sequence: &LoadingSequence) {
        self.progress.set_fraction(f64::from(sequence.progress()) / 100.0);
        self.progress
            .set_text(Some(&format!("{}%", sequence.progress())));
        self.label.set_text(sequence.label());
    }
}

/// Widgets of the main page plus what was last rendered into them.
pub(super) struct MainView {
    pub(super) root: GtkBox,
    pub(super) drop_zone: Frame,
    pub(super) browse_button: Button,
    pub(super) clear_button: Button,
    pub(super) extract_button: Button,
    pub(super) copy_button: Button,
    pub(super) save_button: Button,
    pub(super) toast_box: GtkBox,
    preview_box: GtkBox,
    preview: Picture,
    file_label: Label,
    progress: ProgressBar,
    error_label: Label,
    result_box: GtkBox,
    result_view: TextView,
    stats_label: Label,
    empty_label: Label,
    rendered_image: RefCell<Option<u64>>,
    rendered_text: RefCell<Option<String>>,
    rendered_toasts: RefCell<Vec<NotificationId>>,
}

impl MainView {
    pub(super) fn new() -> Self {
        let root = GtkBox::new(Orientation::Vertical, 12);
        root.set_margin_top(24);
        root.set_margin_bottom(24);
        root.set_margin_start(24);
        root.set_margin_end(24);

        let title = Label::new(Some("Image to Text"));
        title.add_css_class("title-1");
        root.append(&title);

        let drop_content = GtkBox::new(Orientation::Vertical, 8);
        drop_content.set_margin_top(24);
        drop_content.set_margin_bottom(24);
        let drop_title = Label::new(Some("Upload Your Image"));
        drop_title.add_css_class("title-3");
        let drop_hint = Label::new(Some(
            "Drag & drop, click to browse, or paste from clipboard (Ctrl+V)",
        ));
        let formats = Label::new(Some(&ACCEPTED_FORMAT_LABELS.join("  ")));
        formats.add_css_class("dim-label");
        let browse_button = Button::with_label("Browse…");
        browse_button.set_halign(Align::Center);
        drop_content.append(&drop_title);
        drop_content.append(&drop_hint);
        drop_content.append(&formats);
        drop_content.append(&browse_button);
        let drop_zone = Frame::new(None);
        drop_zone.set_child(Some(&drop_content));
        root.append(&drop_zone);

        let preview_box = GtkBox::new(Orientation::Vertical, 8);
        let preview_header = GtkBox::new(Orientation::Horizontal, 8);
        let file_label = Label::new(None);
        file_label.set_hexpand(true);
        file_label.set_xalign(0.0);
        let clear_button = Button::with_label("Clear");
        preview_header.append(&file_label);
        preview_header.append(&clear_button);
        let preview = Picture::new();
        preview.set_can_shrink(true);
        preview.set_size_request(-1, 240);
        let extract_button = Button::with_label("Extract Text");
        extract_button.add_css_class("suggested-action");
        let progress = ProgressBar::new();
        progress.set_show_text(true);
        preview_box.append(&preview_header);
        preview_box.append(&preview);
        preview_box.append(&extract_button);
        preview_box.append(&progress);
        root.append(&preview_box);

        let error_label = Label::new(None);
        error_label.add_css_class("error");
        error_label.set_wrap(true);
        root.append(&error_label);

        let result_box = GtkBox::new(Orientation::Vertical, 8);
        let result_header = GtkBox::new(Orientation::Horizontal, 8);
        let result_title = Label::new(Some("Extracted Text"));
        result_title.set_hexpand(true);
        result_title.set_xalign(0.0);
        let copy_button = Button::with_label("Copy");
        let save_button = Button::with_label("Save");
        result_header.append(&result_title);
        result_header.append(&copy_button);
        result_header.append(&save_button);
        let result_view = TextView::new();
        result_view.set_editable(false);
        result_view.set_monospace(true);
        result_view.set_wrap_mode(WrapMode::WordChar);
        let scroller = ScrolledWindow::builder()
            .child(&result_view)
            .min_content_height(200)
            .vexpand(true)
            .build();
        let stats_label = Label::new(None);
        stats_label.set_xalign(0.0);
        stats_label.add_css_class("dim-label");
        result_box.append(&result_header);
        result_box.append(&scroller);
        result_box.append(&stats_label);
        root.append(&result_box);

        let empty_label = Label::new(Some(
            "Ready to Extract Text\nUpload an image to get started",
        ));
        empty_label.set_justify(gtk4::Justification::Center);
        empty_label.add_css_class("dim-label");
        root.append(&empty_label);

        let toast_box = GtkBox::new(Orientation::Vertical, 6);
        toast_box.set_halign(Align::End);
        toast_box.set_valign(Align::Start);
        toast_box.set_margin_top(12);
        toast_box.set_margin_end(12);

        Self {
            root,
            drop_zone,
            browse_button,
            clear_button,
            extract_button,
            copy_button,
            save_button,
            toast_box,
            preview_box,
            preview,
            file_label,
            progress,
            error_label,
            result_box,
            result_view,
            stats_label,
            empty_label,
            rendered_image: RefCell::new(None),
            rendered_text: RefCell::new(None),
            rendered_toasts: RefCell::new(Vec::new()),
        }
    }

    /// Brings every widget in line with the workflow. Returns `true` when the
    /// toast stack has to be rebuilt.
    pub(super) fn refresh(&self, workflow: &Workflow) -> bool {
        self.refresh_image(workflow.image(), workflow.image_revision());

        let processing = workflow.is_processing();
        self.extract_button
            .set_sensitive(workflow.can_start_recognition());
        if processing {
            self.extract_button
                .set_label(&format!("Processing... {}%", workflow.progress()));
        } else {
            self.extract_button.set_label("Extract Text");
        }
        self.progress.set_visible(processing);
        self.progress
            .set_fraction(f64::from(workflow.progress()) / 100.0);

        match workflow.error_message() {
            Some(message) => {
                self.error_label.set_text(message);
                self.error_label.set_visible(true);
            }
            None => self.error_label.set_visible(false),
        }

        self.refresh_result(workflow.result_text());
        self.empty_label
            .set_visible(workflow.result_text().is_none() && workflow.error_message().is_none());

        let toasts: Vec<NotificationId> = workflow.notifications().iter().map(|n| n.id).collect();
        let changed = *self.rendered_toasts.borrow() != toasts;
        if changed {
            *self.rendered_toasts.borrow_mut() = toasts;
        }
        changed
    }

    fn refresh_image(&self, image: Option<&UploadedImage>, revision: u64) {
        if *self.rendered_image.borrow() == Some(revision) {
            return;
        }

        match image {
            Some(image) => {
                self.file_label.set_text(image.file_name());
                match preview_texture(image.data()) {
                    Some(texture) => self.preview.set_paintable(Some(&texture)),
                    None => self.preview.set_paintable(None::<&gdk::Paintable>),
                }
                self.preview_box.set_visible(true);
            }
            None => {
                self.preview.set_paintable(None::<&gdk::Paintable>);
                self.preview_box.set_visible(false);
            }
        }
        *self.rendered_image.borrow_mut() = Some(revision);
    }

    fn refresh_result(&self, text: Option<&str>) {
        if self.rendered_text.borrow().as_deref() == text {
            return;
        }
        match text {
            Some(text) => {
                self.result_view.buffer().set_text(text);
                let stats = text_statistics(text);
                self.stats_label.set_text(&format!(
                    "{} characters · {} words",
                    stats.characters, stats.words
                ));
                self.result_box.set_visible(true);
            }
            None => {
                self.result_view.buffer().set_text("");
                self.result_box.set_visible(false);
            }
        }
        *self.rendered_text.borrow_mut() = text.map(str::to_string);
    }
}

pub(super) fn toast_row(message: &str, severity: Severity) -> (GtkBox, Button) {
    let row = GtkBox::new(Orientation::Horizontal, 8);
    row.add_css_class("toast");
    row.add_css_class(severity.as_str());
    let label = Label::new(Some(message));
    label.set_hexpand(true);
    label.set_xalign(0.0);
    let close = Button::with_label("×");
    close.add_css_class("flat");
    row.append(&label);
    row.append(&close);
    (row, close)
}

fn preview_texture(data: &[u8]) -> Option<gdk::Texture> {
    let decoded = match image::load_from_memory(data) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::warn!(%err, "failed to decode image for preview");
            return None;
        }
    };
    let rgba = decoded
        .thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE)
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixbuf = Pixbuf::from_bytes(
        &glib::Bytes::from_owned(rgba.into_raw()),
        Colorspace::Rgb,
        true,
        8,
        width as i32,
        height as i32,
        width as i32 * 4,
    );
    Some(gdk::Texture::for_pixbuf(&pixbuf))
}
