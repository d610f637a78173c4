pub mod config;
pub mod error;
pub mod events;
pub mod render;
pub mod state;
pub mod viewport;
pub mod tasks {
    pub mod fetcher;
    pub mod gallery;
    pub mod pager;
}
