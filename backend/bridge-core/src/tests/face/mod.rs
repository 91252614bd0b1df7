mod machine;
mod transition;
