pub mod organize_commands;
pub mod settings_commands;
