//! Module-level variables.

use rustc_hash::FxHashMap;

use super::Value;

/// Top-level variables shared by every script the VM runs, indexed by the
/// slot the compiler assigned them.
#[derive(Debug, Default)]
pub struct Module {
    names: Vec<String>,
    lookup: FxHashMap<String, usize>,
    values: Vec<Value>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Add a variable, or overwrite it if the name exists. Returns its slot.
    pub fn define(&mut self, name: &str, value: Value) -> usize {
        if let Some(index) = self.find(name) {
            self.values[index] = value;
            return index;
        }
        self.names.push(name.to_string());
        self.values.push(value);
        self.lookup.insert(name.to_string(), self.values.len() - 1);
        self.values.len() - 1
    }

    pub fn get(&self, index: usize) -> Value {
        self.values.get(index).copied().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// Value of the variable `name`, if defined.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.find(name).map(|index| self.values[index])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_assigns_sequential_slots() {
        let mut module = Module::new();
        assert_eq!(module.define("a", Value::Num(1.0)), 0);
        assert_eq!(module.define("b", Value::Null), 1);
        assert_eq!(module.find("b"), Some(1));
        assert_eq!(module.get(0), Value::Num(1.0));
        assert_eq!(module.name(1), Some("b"));
    }

    #[test]
    fn test_redefine_overwrites() {
        let mut module = Module::new();
        module.define("a", Value::Num(1.0));
        assert_eq!(module.define("a", Value::Bool(true)), 0);
        assert_eq!(module.len(), 1);
        assert_eq!(module.lookup("a"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_out_of_range_reads_null() {
        let mut module = Module::new();
        module.set(4, Value::Num(1.0));
        assert_eq!(module.get(4), Value::Null);
        assert!(module.is_empty());
    }
}
