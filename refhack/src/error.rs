use std::fmt::Display;

use crossterm::style::Stylize;

use crate::ux;

/// Item that was not processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub path: String,
    pub message: String,
}

pub struct Collector {
    failures: Vec<Failure>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self { failures: vec![] }
    }

    /// Registers failure. Path already registered without reason gets the reason,
    /// otherwise the first reason wins
    pub fn add(&mut self, path: &str, message: impl Into<String>) {
        let message = message.into();
        match self.failures.iter_mut().find(|f| f.path == path) {
            Some(existing) if existing.message.is_empty() => existing.message = message,
            Some(_) => {}
            None => self.failures.push(Failure {
                path: path.to_owned(),
                message,
            }),
        }
    }

    /// Adds path if it's not registered yet
    pub fn add_path(&mut self, path: &str) {
        self.add(path, "");
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.failures.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.failures.is_empty() {
            writeln!(
                f,
                "{}",
                " These items were not processed:".dark_red().bold()
            )?;
            let table = ux::new_table(
                ["Path", "Reason"],
                self.failures
                    .iter()
                    .map(|x| [x.path.as_str(), x.message.as_str()]),
            );
            writeln!(f, "{table}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_path_does_not_duplicate() {
        // Arrange
        let mut collector = Collector::new();
        collector.add("a.sln", "Invalid project definition");

        // Act
        collector.add_path("a.sln");
        collector.add_path("b.sln");

        // Assert
        assert_eq!(collector.count(), 2);
        assert_eq!(collector.failures()[0].message, "Invalid project definition");
        assert_eq!(collector.failures()[1].path, "b.sln");
    }

    #[test]
    fn add_sets_reason_of_path_only_item() {
        // Arrange
        let mut collector = Collector::new();
        collector.add_path("a.sln");

        // Act
        collector.add("a.sln", "Unexpected end of file");
        collector.add("a.sln", "Another reason");

        // Assert
        assert_eq!(collector.count(), 1);
        assert_eq!(collector.failures()[0].message, "Unexpected end of file");
    }

    #[test]
    fn display_empty() {
        // Arrange
        let collector = Collector::default();

        // Act
        let s = collector.to_string();

        // Assert
        assert!(s.is_empty());
        assert!(collector.is_empty());
    }

    #[test]
    fn display_failures() {
        // Arrange
        let mut collector = Collector::default();
        collector.add("/src/app/app.csproj", "Failed to read project file");

        // Act
        let s = collector.to_string();

        // Assert
        assert!(s.contains("/src/app/app.csproj"));
        assert!(s.contains("Failed to read project file"));
    }
}
