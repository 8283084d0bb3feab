use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser};

use crate::language::Language;

/// Regenerate TypeScript definitions from model sources.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
pub struct Cli {
    /// Model file or directory to generate TypeScript definitions for.
    #[arg(conflicts_with = "watch")]
    pub path: Option<PathBuf>,

    /// Watch the configured model directories and regenerate on change.
    #[arg(short, long)]
    pub watch: bool,

    /// Log debug details (spawned commands, watched roots) to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a parsed command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Usage,
    Watch,
    Generate(PathBuf),
}

impl Cli {
    /// The clap command with the binary name, about text and examples of `language`.
    pub fn command_for(language: Language) -> clap::Command {
        let tool = language.tool_name();
        let ext = language.extension();
        Self::command()
            .name(tool)
            .bin_name(tool)
            .about(format!(
                "Regenerate TypeScript definitions from {}",
                language.models_label()
            ))
            .after_help(format!(
                "Examples:\n  \
                 {tool} <file.{ext}>    Generate TypeScript definitions for a specific file\n  \
                 {tool} <dir>          Generate TypeScript definitions for all files in directory\n  \
                 {tool} --watch        Start watch mode"
            ))
    }

    /// Parse the process arguments, exiting on `--help`, `--version` or errors.
    pub fn parse_for(language: Language) -> Self {
        let matches = Self::command_for(language).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_for<I, T>(language: Language, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command_for(language).try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    pub fn mode(&self) -> Mode {
        match (&self.path, self.watch) {
            (_, true) => Mode::Watch,
            (Some(path), false) => Mode::Generate(path.clone()),
            (None, false) => Mode::Usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_usage() {
        let cli = Cli::try_parse_for(Language::Python, ["py2ts"]).unwrap();
        assert_eq!(cli.mode(), Mode::Usage);
    }

    #[test]
    fn test_watch_flags() {
        for flag in ["--watch", "-w"] {
            let cli = Cli::try_parse_for(Language::Go, ["go2ts", flag]).unwrap();
            assert_eq!(cli.mode(), Mode::Watch);
        }
    }

    #[test]
    fn test_bare_path_is_generate() {
        let cli = Cli::try_parse_for(Language::Python, ["py2ts", "python/models"]).unwrap();
        assert_eq!(cli.mode(), Mode::Generate(PathBuf::from("python/models")));
    }

    #[test]
    fn test_help_flags_are_display_help() {
        for flag in ["--help", "-h"] {
            let err = Cli::try_parse_for(Language::Go, ["go2ts", flag]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        }
    }

    #[test]
    fn test_path_and_watch_conflict() {
        let err = Cli::try_parse_for(Language::Go, ["go2ts", "--watch", "go/models"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_usage_mentions_tool_name() {
        let help = Cli::command_for(Language::Python).render_help().to_string();
        assert!(help.contains("py2ts --watch"), "help was:\n{help}");
        assert!(help.contains("Pydantic models"));
    }
}
