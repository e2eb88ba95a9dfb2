pub mod asmbench_commands;
pub mod pipeline;
