//! Client-side wiring for the device mirror: configuration, the adb
//! device bridge, terminal input translation, and the viewer UI.

pub mod adb;
pub mod config;
pub mod input;
pub mod viewer;
