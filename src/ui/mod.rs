pub mod icons;
pub mod output;
pub mod progress;
pub mod shell;
pub mod table;
pub mod theme;

pub use icons::{access_icon, Icons};
pub use output::{header, info, section, success, summary_row, warn};
pub use progress::Spinner;
pub use shell::TerminalShell;
pub use table::{items_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
