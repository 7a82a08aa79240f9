use smartstring::{LazyCompact, SmartString};

pub mod abbreviation;
pub mod balance;
pub mod buffer;
pub mod command;
pub mod config;
pub mod edit_point;
pub mod history;
pub mod matcher;
pub mod math;
pub mod movement;
pub mod number;
pub mod position;
pub mod range;
pub mod select_item;
pub mod selection;
pub mod snippet;
pub mod syntax;
pub mod tag;
pub mod transaction;

pub type Tendril = SmartString<LazyCompact>;
