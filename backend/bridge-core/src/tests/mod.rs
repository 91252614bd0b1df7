mod bridge;
mod config;
mod face;
mod protocol;
