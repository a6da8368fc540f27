use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;

use getty::{EdgeIssue, FriendRecord, HomeFeed, Post, RepairReport};

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// One row of a list table
pub trait TableRow {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
    fn compact(&self) -> String;
}

/// A yes/no answer such as "is alice following bob"
#[derive(Debug, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: bool,
}

/// Output manager handles formatting and display
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(&self.options);
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        if !self.options.quiet && self.options.output_format != OutputFormat::Json {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.success)
            } else {
                format!("{} {}", ICONS.success.color(THEME.success), message.color(THEME.success))
            };
            println!("{output}");
        }
    }

    /// Display an error message with color and icon. Shown even when quiet.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.error_line(message));
    }

    fn error_line(&self, message: &str) -> String {
        if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        }
    }

    /// Display a warning message
    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.warning)
            } else {
                format!("{} {}", ICONS.warning.color(THEME.warning), message.color(THEME.warning))
            };
            eprintln!("{output}");
        }
    }

    /// Display verbose information (only if verbose mode is enabled)
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.arrow)
            } else {
                format!("{} {}", ICONS.arrow.color(THEME.muted), message.color(THEME.muted))
            };
            eprintln!("{output}");
        }
    }

    /// Display info message with color and icon
    pub fn info(&self, message: &str) {
        if !self.options.quiet && self.options.output_format != OutputFormat::Json {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.info)
            } else {
                format!("{} {}", ICONS.info.color(THEME.info), message.color(THEME.info))
            };
            println!("{output}");
        }
    }

    /// Display a key-value pair
    pub fn key_value(&self, key: &str, value: &str) {
        if !self.options.quiet && self.options.output_format != OutputFormat::Json {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value))
            };
            println!("{output}");
        }
    }

    /// Display a bullet list item
    pub fn bullet(&self, text: &str) {
        if !self.options.quiet && self.options.output_format != OutputFormat::Json {
            let output = if self.options.no_color {
                format!("  {} {text}", ICONS.bullet)
            } else {
                format!("  {} {text}", ICONS.bullet.color(THEME.muted))
            };
            println!("{output}");
        }
    }
}

fn themed_table(options: &GlobalOptions, headers: &[&str]) -> Table {
    let mut table = Table::new();
    if options.no_color {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    } else {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    }
    if !headers.is_empty() {
        let cells: Vec<Cell> = headers
            .iter()
            .map(|header| {
                let cell = Cell::new(header).add_attribute(Attribute::Bold);
                if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
            })
            .collect();
        table.set_header(cells);
    }
    table
}

impl<T> TableDisplay for Vec<T>
where
    T: TableRow + Serialize,
{
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &T::headers());
        if self.is_empty() {
            table.add_row(vec![Cell::new("No items found")]);
            return table;
        }
        for item in self {
            table.add_row(item.row());
        }
        table
    }

    fn to_compact(&self) -> String {
        if self.is_empty() {
            return "Count: 0".to_string();
        }
        self.iter().map(T::compact).collect::<Vec<_>>().join("\n")
    }
}

impl TableRow for Post {
    fn headers() -> Vec<&'static str> {
        vec!["Date", "User", "Prompt", ICONS.heart, ICONS.comment]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.date_key.to_string(),
            self.user_id.clone(),
            self.user_prompt.clone(),
            self.likes.len().to_string(),
            self.comments.len().to_string(),
        ]
    }

    fn compact(&self) -> String {
        format!(
            "{}/{} {} {} {} {}",
            self.user_id,
            self.date_key,
            ICONS.heart,
            self.likes.len(),
            ICONS.comment,
            self.comments.len()
        )
    }
}

impl TableDisplay for Post {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &[]);
        table.add_row(vec![Cell::new("User").add_attribute(Attribute::Bold), Cell::new(&self.user_id)]);
        table.add_row(vec![
            Cell::new("Date").add_attribute(Attribute::Bold),
            Cell::new(self.date_key.to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Prompt").add_attribute(Attribute::Bold),
            Cell::new(&self.user_prompt),
        ]);
        if let Some(given) = &self.given_prompt {
            table.add_row(vec![Cell::new("Given prompt").add_attribute(Attribute::Bold), Cell::new(given)]);
        }
        table.add_row(vec![
            Cell::new("Image").add_attribute(Attribute::Bold),
            Cell::new(truncate(self.image.source.payload(), 60)),
        ]);
        table.add_row(vec![
            Cell::new("Likes").add_attribute(Attribute::Bold),
            Cell::new(self.likes.join(", ")),
        ]);
        for comment in &self.comments {
            table.add_row(vec![
                Cell::new(format!("{} {}", ICONS.comment, comment.username)),
                Cell::new(format!("{} ({})", comment.comment, comment.time.format("%Y-%m-%d %H:%M"))),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        TableRow::compact(self)
    }
}

impl TableDisplay for FriendRecord {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &["User", "Following", "Followers"]);
        table.add_row(vec![
            self.id.clone(),
            self.following.join(", "),
            self.followers.join(", "),
        ]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} following={} followers={}",
            self.id,
            self.following.len(),
            self.followers.len()
        )
    }
}

impl TableDisplay for HomeFeed {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = self.posts.to_table(options);
        for failure in &self.skipped {
            table.add_row(vec![
                String::new(),
                failure.user_id.clone(),
                format!("{} {}", ICONS.warning, failure.message),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!("posts={} skipped={}", self.posts.len(), self.skipped.len())
    }
}

impl TableRow for EdgeIssue {
    fn headers() -> Vec<&'static str> {
        vec!["Follower", "Followee", "Problem"]
    }

    fn row(&self) -> Vec<String> {
        let edge = self.edge();
        let problem = match self {
            EdgeIssue::MissingFollower(_) => "followee does not list the follower",
            EdgeIssue::StaleFollower(_) => "follower does not list the followee",
        };
        vec![edge.follower.clone(), edge.followee.clone(), problem.to_string()]
    }

    fn compact(&self) -> String {
        let edge = self.edge();
        format!("{} {} {}", edge.follower, ICONS.arrow, edge.followee)
    }
}

impl TableDisplay for RepairReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &["Change", "Follower", "Followee"]);
        for edge in &self.added_followers {
            table.add_row(vec!["added follower", edge.follower.as_str(), edge.followee.as_str()]);
        }
        for edge in &self.removed_followers {
            table.add_row(vec!["removed follower", edge.follower.as_str(), edge.followee.as_str()]);
        }
        if self.is_clean() {
            table.add_row(vec!["nothing to repair", "", ""]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} added={} removed={}",
            self.user_id,
            self.added_followers.len(),
            self.removed_followers.len()
        )
    }
}

impl TableDisplay for Answer {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &[]);
        table.add_row(vec![self.question.clone(), if self.answer { "yes" } else { "no" }.to_string()]);
        table
    }

    fn to_compact(&self) -> String {
        self.answer.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}…")
}
