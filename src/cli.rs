use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Artifact Forge - Build generated source files into downloadable artifacts
#[derive(Parser, Debug)]
#[command(name = "artifact-forge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "PATH",
        env = "ARTIFACT_FORGE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build source directories or JSON request files into artifacts
    Build(BuildArgs),

    /// List supported languages
    Languages(LanguagesArgs),

    /// Detect the language of a source directory or request file
    Detect(DetectArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Source directories or JSON request files
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Language to build as, overriding detection
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Project name used for the artifact file
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Directory artifacts are written to
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output: PathBuf,

    /// Parallel build jobs
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

#[derive(Args, Debug)]
pub struct LanguagesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Source directory or JSON request file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_build_command() {
        let cli = Cli::try_parse_from([
            "artifact-forge",
            "build",
            "proj-a",
            "req.json",
            "--language",
            "go",
            "-n",
            "hello",
            "-j",
            "2",
        ])
        .unwrap();

        match cli.command {
            Command::Build(args) => {
                assert_eq!(args.inputs.len(), 2);
                assert_eq!(args.language.as_deref(), Some("go"));
                assert_eq!(args.name.as_deref(), Some("hello"));
                assert_eq!(args.jobs, Some(2));
                assert_eq!(args.output, PathBuf::from("."));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn build_requires_input() {
        assert!(Cli::try_parse_from(["artifact-forge", "build"]).is_err());
    }

    #[test]
    fn parse_languages_json() {
        let cli = Cli::try_parse_from(["artifact-forge", "languages", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Languages(LanguagesArgs { json: true })));
    }

    #[test]
    fn parse_global_flags() {
        let cli =
            Cli::try_parse_from(["artifact-forge", "-vv", "detect", "src", "--config", "c.toml"])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::try_parse_from(["artifact-forge", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Command::Completions(_)));
    }
}
