mod app_state;

pub use app_state::{resolve_data_dir, LauncherSettings, LauncherState};
