use crate::presenter::AppLocationItem;
use crate::screen::HostShell;
use crate::ui::Spinner;

/// Terminal host for the location apps screen.
///
/// Progress is a spinner; items are kept for the caller to render.
#[derive(Default)]
pub struct TerminalShell {
    spinner: Option<Spinner>,
    items: Vec<AppLocationItem>,
}

impl TerminalShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[AppLocationItem] {
        &self.items
    }

    pub fn is_progress_visible(&self) -> bool {
        self.spinner.is_some()
    }
}

impl HostShell for TerminalShell {
    fn set_progress_visible(&mut self, visible: bool) {
        if visible {
            self.spinner.get_or_insert_with(|| Spinner::new("Scanning installed apps..."));
        } else if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn show_items(&mut self, items: Vec<AppLocationItem>) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(&format!("Listing {} apps", items.len()));
        }
        self.items = items;
    }
}

impl Drop for TerminalShell {
    fn drop(&mut self) {
        self.set_progress_visible(false);
    }
}
