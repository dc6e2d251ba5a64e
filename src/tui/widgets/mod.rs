pub mod activity_list;
pub mod color;
pub mod confirm_delete;
pub mod dashboard;
pub mod form;
pub mod history;
pub mod status_bar;
pub mod tabs;
