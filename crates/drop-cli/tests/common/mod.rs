// Common test utilities for command scenarios

use drop_cli::{Dispatcher, LineSource, Operation, Selection, SelectionBuffer};
use drop_core::{KvStore, Result};
use drop_storage::{BackendRegistry, StoreConfig};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use tempfile::TempDir;

/// Console input fed from a fixed script
#[derive(Default)]
pub struct ScriptedLines {
    pub lines: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedLines {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            prompts: Vec::new(),
        }
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}

/// Selection buffers held in memory
#[derive(Default)]
pub struct FakeSelections {
    pub buffers: HashMap<&'static str, String>,
}

fn slot(selection: Selection) -> &'static str {
    match selection {
        Selection::Primary => "primary",
        Selection::Clipboard => "clipboard",
    }
}

impl FakeSelections {
    #[allow(dead_code)]
    pub fn get(&self, selection: Selection) -> Option<&str> {
        self.buffers.get(slot(selection)).map(String::as_str)
    }

    #[allow(dead_code)]
    pub fn set(&mut self, selection: Selection, value: &str) {
        self.buffers.insert(slot(selection), value.to_string());
    }
}

impl SelectionBuffer for FakeSelections {
    fn read(&mut self, selection: Selection) -> Result<Option<String>> {
        Ok(self.buffers.get(slot(selection)).cloned().filter(|v| !v.is_empty()))
    }

    fn write(&mut self, selection: Selection, value: &str) -> Result<()> {
        self.set(selection, value);
        Ok(())
    }
}

/// What one command printed
#[derive(Debug, Default)]
pub struct Transcript {
    pub stdout: String,
    pub stderr: String,
    pub prompts: Vec<String>,
}

/// Test fixture owning a temporary database
pub struct CliFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub selections: FakeSelections,
}

impl CliFixture {
    pub fn new(file_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join(file_name);
        Self {
            temp_dir,
            db_path,
            selections: FakeSelections::default(),
        }
    }

    pub fn open(&self) -> Box<dyn KvStore> {
        BackendRegistry::default()
            .open(&self.db_path, &StoreConfig::default())
            .expect("Failed to open store")
    }

    /// Opens the database, runs one operation with scripted input, closes it
    pub fn run(&mut self, operation: Operation, input: &[&str]) -> Transcript {
        let mut store = self.open();
        let mut lines = ScriptedLines::new(input);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        {
            let mut dispatcher = Dispatcher::new(
                store.as_mut(),
                &mut out,
                &mut err,
                &mut lines,
                &mut self.selections,
            );
            dispatcher.run(operation).expect("dispatch failed");
        }
        store.close().expect("close failed");

        Transcript {
            stdout: String::from_utf8(out).expect("stdout is utf-8"),
            stderr: String::from_utf8(err).expect("stderr is utf-8"),
            prompts: lines.prompts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_db_lives_in_temp_dir() {
        let fixture = CliFixture::new("drop.dbm");
        assert!(fixture.db_path.starts_with(fixture.temp_dir.path()));
        assert!(!fixture.db_path.exists());
    }
}
