mod bridge;
mod settings;
