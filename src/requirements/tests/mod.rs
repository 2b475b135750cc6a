mod common;
mod templates;
