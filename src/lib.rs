pub mod logger;

pub mod app;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod io;
