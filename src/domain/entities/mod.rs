pub mod change_type;
pub mod history;
pub mod raw_event;
pub mod subscription;
