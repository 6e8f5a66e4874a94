//! Hooks into the evaluator and its value storage.
//!
//! The I/O layer never looks inside the interpreter's values. It converts
//! them to strings, assigns variables by name and reads `ARGV` through this
//! trait.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

pub trait Runtime {
    type Value;

    /// String conversion of a stored value (CONVFMT rules are the evaluator's)
    fn value_to_string(&self, value: &Self::Value) -> String;

    /// Assign a scalar variable by name, as a `var=value` argument does
    fn set_var(&mut self, name: &str, value: &str) -> Result<()>;

    /// Current ARGC
    fn argc(&self) -> usize;

    /// `ARGV[index]` without creating the element when it is missing
    fn argv(&self, index: usize) -> Option<&Self::Value>;
}

/// Minimal variable store: string scalars plus an `ARGV` list
#[derive(Debug, Clone, Default)]
pub struct Globals {
    vars: HashMap<String, String>,
    arrays: HashSet<String>,
    argv: Vec<String>,
}

impl Globals {
    /// `argv[0]` is the program name, files and assignments follow
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Mark `name` as an array so scalar assignment to it fails
    pub fn declare_array(&mut self, name: &str) {
        self.arrays.insert(name.to_string());
    }

    pub fn set_argv(&mut self, index: usize, value: &str) {
        if self.argv.len() <= index {
            self.argv.resize(index + 1, String::new());
        }
        self.argv[index] = value.to_string();
    }
}

impl Runtime for Globals {
    type Value = String;

    fn value_to_string(&self, value: &String) -> String {
        value.clone()
    }

    fn set_var(&mut self, name: &str, value: &str) -> Result<()> {
        if self.arrays.contains(name) {
            return Err(Error::assignment(name, "can't use array in scalar context"));
        }
        self.vars.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn argc(&self) -> usize {
        self.argv.len()
    }

    fn argv(&self, index: usize) -> Option<&String> {
        self.argv.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_argv() {
        let globals = Globals::new(vec!["awk".into(), "a.txt".into()]);
        assert_eq!(globals.argc(), 2);
        assert_eq!(globals.argv(1).map(String::as_str), Some("a.txt"));
        assert_eq!(globals.argv(7), None);
        assert_eq!(globals.argc(), 2);
    }

    #[test]
    fn test_globals_assignment() {
        let mut globals = Globals::default();
        globals.set_var("x", "5").unwrap();
        assert_eq!(globals.get("x"), Some("5"));
    }

    #[test]
    fn test_array_assignment_fails() {
        let mut globals = Globals::default();
        globals.declare_array("seen");
        let err = globals.set_var("seen", "1").unwrap_err();
        assert!(matches!(err, Error::Assignment { .. }));
    }

    #[test]
    fn test_set_argv_grows() {
        let mut globals = Globals::new(vec!["awk".into()]);
        globals.set_argv(2, "late.txt");
        assert_eq!(globals.argc(), 3);
        assert_eq!(globals.argv(1).map(String::as_str), Some(""));
    }
}
