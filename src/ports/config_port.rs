//! Configuration access port trait.
//!
//! Section and key names are lower-case; adapters normalize on load.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn sections(&self) -> Vec<String>;
}
