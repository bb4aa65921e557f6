// UI module - native dialogs and console progress
//
// This module contains:
// - dialogs: folder picker and message boxes (rfd)
// - progress: renders ProgressEvents from a running pipeline to the console

pub mod dialogs;
pub mod progress;

pub use dialogs::{pick_game_folder, show_error, show_info};
pub use progress::follow;
