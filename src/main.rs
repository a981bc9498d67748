use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use branch_publish::cache::{cache_root, clean_cache};
use branch_publish::{
    init_telemetry, CommitOutcome, Checkout, LogFormat, PublishOptions, Publisher, User,
};

#[derive(Parser)]
#[command(name = "branch-publish")]
#[command(version)]
#[command(about = "Publish a directory of files to a branch of a git repository")]
#[command(long_about = "Copies the files of a build directory into a cached working copy of the \
                       target branch, commits them if anything changed, and pushes. Options are \
                       read from branch-publish.toml and BRANCH_PUBLISH_* variables; flags win.")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
    /// Log each git step
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a directory to a branch
    Publish(PublishArgs),
    /// Remove all cached working copies
    Clean,
    /// Print the effective options as TOML
    Config(OptionArgs),
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Base directory containing the files to publish
    #[arg(short, long, default_value = ".")]
    dist: PathBuf,
    #[command(flatten)]
    options: OptionArgs,
}

// Flags shared by `publish` and `config`
#[derive(Args, Debug)]
struct OptionArgs {
    /// Pattern selecting files to publish (repeatable)
    #[arg(short, long)]
    src: Vec<String>,
    /// Target branch
    #[arg(short, long)]
    branch: Option<String>,
    /// Directory in the target branch that receives the files
    #[arg(short = 'e', long)]
    dest: Option<String>,
    /// Only add files, never remove existing ones
    #[arg(short, long)]
    add: bool,
    /// Path to the git executable
    #[arg(short, long)]
    git: Option<String>,
    /// Commit message
    #[arg(short, long)]
    message: Option<String>,
    /// Tag to create at the new commit
    #[arg(short, long)]
    tag: Option<String>,
    /// Repository URL (defaults to the URL of the remote in the current directory)
    #[arg(short, long)]
    repo: Option<String>,
    /// Remote alias
    #[arg(short = 'o', long)]
    remote: Option<String>,
    /// Depth of the initial shallow clone
    #[arg(long)]
    depth: Option<u32>,
    /// Working copy location (defaults to a per-repository cache directory)
    #[arg(long)]
    clone_dir: Option<String>,
    /// Pattern selecting existing files to remove before copying
    #[arg(long)]
    remove: Option<String>,
    /// Include dotfiles
    #[arg(long)]
    dotfiles: bool,
    /// Write a .nojekyll file
    #[arg(long)]
    nojekyll: bool,
    /// Write a CNAME file with this domain
    #[arg(long)]
    cname: Option<String>,
    /// Commit but do not push
    #[arg(short = 'n', long)]
    no_push: bool,
    /// Recreate the branch without history and force-push it
    #[arg(short = 'f', long)]
    no_history: bool,
    /// Commit identity as "Name <email>"
    #[arg(short, long)]
    user: Option<User>,
    /// Hide error detail that may contain credentials
    #[arg(short = 'x', long)]
    silent: bool,
    /// Kill git commands running longer than this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl OptionArgs {
    /// Flags override file and environment options.
    fn apply(&self, options: &mut PublishOptions) {
        if !self.src.is_empty() {
            options.src = self.src.clone();
        }
        set(&mut options.branch, &self.branch);
        set(&mut options.dest, &self.dest);
        set(&mut options.git, &self.git);
        set(&mut options.message, &self.message);
        set(&mut options.remote, &self.remote);
        set(&mut options.remove, &self.remove);
        if let Some(depth) = self.depth {
            options.depth = depth;
        }
        if self.tag.is_some() {
            options.tag = self.tag.clone();
        }
        if self.repo.is_some() {
            options.repo = self.repo.clone();
        }
        if self.clone_dir.is_some() {
            options.clone_dir = self.clone_dir.clone();
        }
        if self.cname.is_some() {
            options.cname = self.cname.clone();
        }
        if self.user.is_some() {
            options.user = self.user.clone();
        }
        if self.timeout.is_some() {
            options.timeout_secs = self.timeout;
        }
        options.add |= self.add;
        options.dotfiles |= self.dotfiles;
        options.nojekyll |= self.nojekyll;
        options.silent |= self.silent;
        if self.no_push {
            options.push = false;
        }
        if self.no_history {
            options.history = false;
        }
    }
}

fn set(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        target.clone_from(value);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    init_telemetry(format, level)?;
    PublishOptions::load_env_file()?;

    match cli.command {
        Commands::Publish(args) => {
            tokio::runtime::Runtime::new()?.block_on(async { publish_command(args).await })
        }
        Commands::Clean => {
            tokio::runtime::Runtime::new()?.block_on(async { clean_command().await })
        }
        Commands::Config(args) => config_command(args),
    }
}

fn effective_options(args: &OptionArgs) -> Result<PublishOptions> {
    let mut options = PublishOptions::load()?;
    args.apply(&mut options);
    Ok(options)
}

async fn publish_command(args: PublishArgs) -> Result<()> {
    let options = effective_options(&args.options)?;
    let branch = options.branch.clone();
    let publisher = Publisher::new(options, std::env::current_dir()?);

    let report = publisher.publish(&args.dist, None).await?;

    if report.checkout == Checkout::Orphan {
        println!("Created branch {branch}");
    }
    match report.commit {
        CommitOutcome::Committed => println!("Committed changes to {branch}"),
        CommitOutcome::Unchanged => println!("No changes to commit on {branch}"),
    }
    if report.pushed {
        println!("Published");
    } else {
        println!("Not pushed; working copy at {}", report.clone_dir.display());
    }
    Ok(())
}

async fn clean_command() -> Result<()> {
    clean_cache().await?;
    println!("Removed {}", cache_root().display());
    Ok(())
}

fn config_command(args: OptionArgs) -> Result<()> {
    let options = effective_options(&args)?;
    print!("{}", options.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("branch-publish").chain(args.iter().copied())).unwrap()
    }

    fn publish_args(args: &[&str]) -> PublishArgs {
        match parse(args).command {
            Commands::Publish(args) => args,
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_flags_override_options() {
        let args = publish_args(&[
            "publish", "-d", "dist", "-b", "gh-pages", "-s", "**/*.html", "-s", "*.css",
            "-n", "-f", "-x", "-u", "Bot <bot@example.com>", "--depth", "3",
        ]);
        let mut options = PublishOptions::default();
        args.options.apply(&mut options);

        assert_eq!(args.dist, PathBuf::from("dist"));
        assert_eq!(options.branch, "gh-pages");
        assert_eq!(options.src, vec!["**/*.html", "*.css"]);
        assert!(!options.push);
        assert!(!options.history);
        assert!(options.silent);
        assert_eq!(options.depth, 3);
        assert_eq!(options.user.unwrap().email, "bot@example.com");
    }

    #[test]
    fn test_absent_flags_keep_options() {
        let args = publish_args(&["publish"]);
        let mut options = PublishOptions {
            branch: "docs".to_string(),
            push: false,
            ..PublishOptions::default()
        };
        args.options.apply(&mut options);

        assert_eq!(options.branch, "docs");
        assert!(!options.push);
        assert_eq!(options.src, vec!["**/*"]);
    }

    #[test]
    fn test_config_takes_option_flags_but_not_dist() {
        match parse(&["config", "-b", "docs", "-n"]).command {
            Commands::Config(args) => {
                let mut options = PublishOptions::default();
                args.apply(&mut options);
                assert_eq!(options.branch, "docs");
                assert!(!options.push);
            }
            _ => panic!("expected config"),
        }
        assert!(Cli::try_parse_from(["branch-publish", "config", "--dist", "out"]).is_err());
        assert!(Cli::try_parse_from(["branch-publish", "config", "-d", "out"]).is_err());
    }

    #[test]
    fn test_invalid_user_is_rejected() {
        let result = Cli::try_parse_from(["branch-publish", "publish", "-u", "nobody"]);
        assert!(result.is_err());
    }
}
