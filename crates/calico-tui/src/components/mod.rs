pub mod header;
pub mod log_panel;
pub mod now_playing;
pub mod rating_pane;
pub mod recent;
