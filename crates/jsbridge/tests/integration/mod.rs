mod common;
mod fetch;
mod session;
