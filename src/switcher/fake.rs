//! Scripted in-memory switcher for tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use super::{params, SwitcherClient};

/// A command the fake received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub function: String,
    pub params: Vec<(String, String)>,
}

impl RecordedCommand {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Succeeds on everything unless told otherwise
#[derive(Default)]
pub struct FakeSwitcher {
    offline: Mutex<bool>,
    failing_functions: Mutex<HashSet<String>>,
    failing_values: Mutex<HashSet<(String, String)>>,
    calls: Mutex<Vec<RecordedCommand>>,
}

impl FakeSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Every call to `function` returns false
    pub fn fail_function(&self, function: &str) {
        self.failing_functions
            .lock()
            .unwrap()
            .insert(function.to_string());
    }

    /// Calls to `function` whose `Value` parameter equals `value` return false
    pub fn fail_value(&self, function: &str, value: usize) {
        self.failing_values
            .lock()
            .unwrap()
            .insert((function.to_string(), value.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, function: &str) -> Vec<RecordedCommand> {
        self.calls()
            .into_iter()
            .filter(|c| c.function == function)
            .collect()
    }
}

#[async_trait]
impl SwitcherClient for FakeSwitcher {
    async fn send_command(&self, function: &str, command_params: &[(&str, String)]) -> bool {
        let command = RecordedCommand {
            function: function.to_string(),
            params: command_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };
        self.calls.lock().unwrap().push(command.clone());

        if *self.offline.lock().unwrap() {
            return false;
        }
        if self.failing_functions.lock().unwrap().contains(function) {
            return false;
        }
        if let Some(value) = command.param(params::VALUE) {
            let key = (function.to_string(), value.to_string());
            if self.failing_values.lock().unwrap().contains(&key) {
                return false;
            }
        }
        true
    }

    async fn check_connection(&self) -> bool {
        !*self.offline.lock().unwrap()
    }
}
