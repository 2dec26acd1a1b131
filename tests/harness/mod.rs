#![allow(dead_code)]

pub mod mudrex_stub;
pub mod temp_db;
