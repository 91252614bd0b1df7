mod builder;
mod kind;
mod payload;
