mod overrides;
mod parameters;
