use std::fmt;

use serde_json::{Map, Value};

use crate::state::OutputFormat;

/// Named result fields of a command, rendered in the configured format
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    format: OutputFormat,
    fields: Vec<(&'static str, Value)>,
}

impl Report {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    #[cfg(test)]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .and_then(|(_, value)| value.as_str())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            OutputFormat::Hex => {
                for (i, (name, value)) in self.fields.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    match value {
                        // PEM blocks
                        Value::String(s) if s.contains('\n') => {
                            write!(f, "{}:\n{}", name, s.trim_end())?
                        }
                        Value::String(s) => write!(f, "{}: {}", name, s)?,
                        other => write!(f, "{}: {}", name, other)?,
                    }
                }
                Ok(())
            }
            OutputFormat::Json => {
                let object: Map<String, Value> = self
                    .fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();
                let json = serde_json::to_string_pretty(&Value::Object(object))
                    .map_err(|_| fmt::Error)?;
                write!(f, "{}", json)
            }
        }
    }
}
