pub mod app;
pub mod components;
pub mod config;
pub mod event;
pub mod html;
pub mod overlay;
pub mod poll;
pub mod refresh_timer;
pub mod view;
