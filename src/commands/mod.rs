pub mod check;
pub mod completions;
pub mod hooks;
pub mod serve;
