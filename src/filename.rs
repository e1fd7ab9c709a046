//! Names given to rollover files when they are stored.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::error::{Error, Result};

const DATE_TOKEN_OPEN: &str = "%{date=";

pub trait FilenameGenerator: Send + Sync {
    /// Derives the stored name from `name`.
    fn generate(&self, name: &str) -> String;
}

/// Expands `%{date=FMT}` tokens with the local time formatted by the strftime
/// pattern `FMT`. Text outside tokens is kept as is; `name` is ignored.
#[derive(Debug, Clone)]
pub struct DateTemplateFilenameGenerator {
    template: String,
}

impl DateTemplateFilenameGenerator {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for format in date_formats(&template)? {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(Error::Config(format!("invalid date format '{format}' in '{template}'")));
            }
        }
        Ok(Self { template })
    }

    pub fn expand(&self, now: DateTime<Local>) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        // tokens were validated in new()
        while let Some(start) = rest.find(DATE_TOKEN_OPEN) {
            let after = &rest[start + DATE_TOKEN_OPEN.len()..];
            let Some(end) = after.find('}') else { break };
            out.push_str(&rest[..start]);
            out.push_str(&now.format(&after[..end]).to_string());
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl FilenameGenerator for DateTemplateFilenameGenerator {
    fn generate(&self, _name: &str) -> String {
        self.expand(Local::now())
    }
}

fn date_formats(template: &str) -> Result<Vec<&str>> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(DATE_TOKEN_OPEN) {
        let after = &rest[start + DATE_TOKEN_OPEN.len()..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::Config(format!("unterminated date token in '{template}'")))?;
        found.push(&after[..end]);
        rest = &after[end + 1..];
    }
    Ok(found)
}

/// Appends an extension unless the name already ends with it.
#[derive(Debug, Clone)]
pub struct FileExtensionFilenameGenerator {
    extension: String,
}

impl FileExtensionFilenameGenerator {
    pub fn new(extension: &str) -> Self {
        Self { extension: format!(".{}", extension.trim_start_matches('.')) }
    }
}

impl Default for FileExtensionFilenameGenerator {
    fn default() -> Self {
        Self::new("ts")
    }
}

impl FilenameGenerator for FileExtensionFilenameGenerator {
    fn generate(&self, name: &str) -> String {
        if name.ends_with(&self.extension) {
            name.to_string()
        } else {
            format!("{name}{}", self.extension)
        }
    }
}

/// Feeds each generator's output into the next.
#[derive(Default)]
pub struct ListFilenameGenerator {
    generators: Vec<Box<dyn FilenameGenerator>>,
}

impl ListFilenameGenerator {
    pub fn new(generators: Vec<Box<dyn FilenameGenerator>>) -> Self {
        Self { generators }
    }

    pub fn push(mut self, generator: impl FilenameGenerator + 'static) -> Self {
        self.generators.push(Box::new(generator));
        self
    }
}

impl FilenameGenerator for ListFilenameGenerator {
    fn generate(&self, name: &str) -> String {
        self.generators.iter().fold(name.to_string(), |acc, g| g.generate(&acc))
    }
}
