pub mod config_cmd;
pub mod dates;
pub mod save;
pub mod show;
pub mod todo;
pub mod topic;
