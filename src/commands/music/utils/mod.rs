pub mod button_controls;
pub mod component_handlers;
pub mod embedded_messages;
pub mod event_handlers;
pub mod messenger;
pub mod music_manager;
pub mod player_messages;
pub mod selection;
pub mod time_format;
