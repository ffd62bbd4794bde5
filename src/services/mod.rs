pub mod collection;
pub mod editor;
pub mod layout;
pub mod preview;
pub mod slot;
pub mod soundboard;
pub mod soundpad;
