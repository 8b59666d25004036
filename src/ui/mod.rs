pub mod icons;
pub mod output;
pub mod table;

pub use icons::Icons;
pub use output::{error, header, info, is_quiet, success, warn, Tone};
pub use table::stats_table;
