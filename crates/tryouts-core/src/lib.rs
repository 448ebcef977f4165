pub mod beatmap;
pub mod commands;
pub mod events;
pub mod lobby;
pub mod store;
