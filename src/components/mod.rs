pub mod dialog;
pub mod listing;
pub mod login;
pub mod menu;
pub mod status_bar;
