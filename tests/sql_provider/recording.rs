use std::collections::VecDeque;
use std::sync::Mutex;

use datarepo::provider::sql::{SqlCommand, SqlExecutor, SqlRow};
use datarepo::ProviderError;

/// Executor that records every statement and answers from a script.
pub struct RecordingExecutor {
    columns: Option<Vec<String>>,
    statements: Mutex<Vec<SqlCommand>>,
    replies: Mutex<VecDeque<Vec<SqlRow>>>,
    affected: Mutex<VecDeque<usize>>,
}

impl RecordingExecutor {
    /// Executor for a database where the table does not exist yet.
    pub fn empty() -> Self {
        Self {
            columns: None,
            statements: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            affected: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_columns(columns: &[&str]) -> Self {
        Self {
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
            ..Self::empty()
        }
    }

    pub fn reply(self, rows: Vec<SqlRow>) -> Self {
        self.replies.lock().unwrap().push_back(rows);
        self
    }

    pub fn affect(self, count: usize) -> Self {
        self.affected.lock().unwrap().push_back(count);
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|command| command.text.clone())
            .collect()
    }

    pub fn last(&self) -> SqlCommand {
        self.statements.lock().unwrap().last().cloned().unwrap()
    }
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&self, command: &SqlCommand) -> Result<usize, ProviderError> {
        self.statements.lock().unwrap().push(command.clone());
        Ok(self.affected.lock().unwrap().pop_front().unwrap_or(1))
    }

    fn query(&self, command: &SqlCommand) -> Result<Vec<SqlRow>, ProviderError> {
        self.statements.lock().unwrap().push(command.clone());
        Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn table_columns(&self, _table: &str) -> Result<Option<Vec<String>>, ProviderError> {
        Ok(self.columns.clone())
    }
}
