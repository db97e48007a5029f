mod clean;
mod list;
mod run;
mod status;

pub use clean::cmd_clean;
pub use list::cmd_list_targets;
pub use run::cmd_run;
pub use status::cmd_status;
