mod helpers;

mod channel;
mod endpoint;
mod face;
mod settings;
