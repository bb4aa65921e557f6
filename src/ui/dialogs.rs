// Native dialogs
//
// The packer has no window of its own: the folder picker and the message boxes are the
// platform's native dialogs, shown through rfd. All of them block the calling thread.

use camino::Utf8PathBuf;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

/// Title of the folder picker
pub const PICK_FOLDER_TITLE: &str = "Select the folder containing .scs files";

/// Show a native folder picker
///
/// # Returns
/// The selected folder, or None if cancelled or not valid UTF-8
pub fn pick_game_folder() -> Option<Utf8PathBuf> {
    FileDialog::new()
        .set_title(PICK_FOLDER_TITLE)
        .pick_folder()
        .and_then(|path| {
            Utf8PathBuf::try_from(path)
                .map_err(|e| {
                    tracing::error!("Failed to convert path to UTF-8: {}", e);
                    e
                })
                .ok()
        })
}

/// Show a modal error message
pub fn show_error(message: &str) {
    show(MessageLevel::Error, "Error", message);
}

/// Show a modal informational message
pub fn show_info(message: &str) {
    show(MessageLevel::Info, "Info", message);
}

fn show(level: MessageLevel, title: &str, message: &str) {
    MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}
