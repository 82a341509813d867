pub mod day_rollover;
pub mod db_utils;
pub mod roster_cache;
