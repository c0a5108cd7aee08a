pub mod chats;
pub mod config_cmd;
