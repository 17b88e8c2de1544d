use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::Level;

use crate::error::Result;
use crate::psfs::extractor::output_path;

/// What the CLI does with one selected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
    /// Write the resource to this path
    Extract(PathBuf),
    /// An earlier resource with the same name is already scheduled
    SkipDuplicate,
    /// The file exists and `-n` was given
    SkipExisting,
    /// The file exists and `-o` was not given
    SkipWithoutOverwrite,
}

#[derive(Parser, Debug)]
#[command(name = "psfs")]
#[command(version)]
#[command(about = "Unpack resources from PS_FS_V1 archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  psfs -l data.dat                    list resources in data.dat\n  \
  psfs data.dat '*.png' -d out -j 4   extract all .png resources into out/, 4 at a time\n  \
  psfs -p data.dat readme.txt | more  send one resource via pipe into more")]
pub struct Cli {
    /// PS_FS_V1 archive path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Resources to extract, by name or glob (default: all)
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    /// List resources (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with sizes and offsets
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract resources to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract resources into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: PathBuf,

    /// Exclude resources that follow
    #[arg(short = 'x', value_name = "NAME", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Number of resources extracted concurrently
    #[arg(
        short = 'j',
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub jobs: u16,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    /// Diagnostics level: `-q` lowers it to warnings, `-qq` to errors.
    ///
    /// `-v` only changes the listing format.
    pub fn log_level(&self) -> Level {
        match self.quiet {
            0 => Level::INFO,
            1 => Level::WARN,
            _ => Level::ERROR,
        }
    }

    /// Decide what to do with the resource `name`.
    ///
    /// `scheduled` collects the names already accepted so that no two
    /// extractions target the same file.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnsafeName`] if `name` cannot be placed in the
    /// destination directory.
    pub fn plan(&self, name: &str, scheduled: &mut HashSet<String>) -> Result<Planned> {
        let path = output_path(&self.extract_dir, name)?;

        if scheduled.contains(name) {
            return Ok(Planned::SkipDuplicate);
        }
        if path.exists() {
            if self.never_overwrite {
                return Ok(Planned::SkipExisting);
            }
            if !self.overwrite {
                return Ok(Planned::SkipWithoutOverwrite);
            }
        }

        scheduled.insert(name.to_string());
        Ok(Planned::Extract(path))
    }

    /// Whether `name` passes the positional selection and the `-x` exclusions.
    pub fn selects(&self, name: &str) -> bool {
        if !self.names.is_empty() && !self.names.iter().any(|p| name_matches(p, name)) {
            return false;
        }
        !self.exclude.iter().any(|p| name_matches(p, name))
    }
}

/// Exact match, or glob match when the pattern has `*` or `?`.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    if has_glob_chars(pattern) {
        glob_match(pattern, name)
    } else {
        pattern == name
    }
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Match a resource name against a glob with `*` and `?` wildcards.
///
/// `*` matches any run of characters (including none), `?` exactly one.
/// Runs in linear passes: on a mismatch the most recent `*` absorbs one
/// more character and matching resumes from there.
///
/// # Examples
///
/// ```
/// use psfs::cli::glob_match;
///
/// assert!(glob_match("*.test", "testfile.test"));
/// assert!(glob_match("testfile?.test", "testfile2.test"));
/// assert!(!glob_match("*.png", "testfile.test"));
/// ```
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    // Pattern index after the last `*`, and the name index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                p += 1;
                backtrack = Some((p, n));
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star_p, star_n)) => {
                    p = star_p;
                    n = star_n + 1;
                    backtrack = Some((star_p, n));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.txt", "readme.txt"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("*.txt", "readme.md"));
        assert!(!glob_match("file?.dat", "file.dat"));
        assert!(glob_match("a*b*c", "aXXbYYbZc"));
        assert!(!glob_match("a*b*c", "aXXbYY"));
        assert!(glob_match("**", "x"));
        assert!(!glob_match("", "x"));
    }

    #[test]
    fn test_name_matches_exact_without_wildcards() {
        assert!(name_matches("testfile.test", "testfile.test"));
        assert!(!name_matches("testfile", "testfile.test"));
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::parse_from(["psfs", "a.dat", "-v"]);
        assert_eq!(cli.log_level(), Level::INFO);
        let cli = Cli::parse_from(["psfs", "a.dat", "-q"]);
        assert_eq!(cli.log_level(), Level::WARN);
        let cli = Cli::parse_from(["psfs", "a.dat", "-qqq"]);
        assert_eq!(cli.log_level(), Level::ERROR);
    }

    fn cli_in(dir: &std::path::Path, flags: &[&str]) -> Cli {
        let dir = dir.to_str().unwrap();
        let mut args = vec!["psfs", "a.dat", "-d", dir];
        args.extend_from_slice(flags);
        Cli::parse_from(args)
    }

    #[test]
    fn test_plan_new_file_then_duplicate() {
        let out = tempfile::tempdir().unwrap();
        let cli = cli_in(out.path(), &[]);
        let mut scheduled = HashSet::new();

        assert_eq!(
            cli.plan("testfile.test", &mut scheduled).unwrap(),
            Planned::Extract(out.path().join("testfile.test"))
        );
        assert_eq!(
            cli.plan("testfile.test", &mut scheduled).unwrap(),
            Planned::SkipDuplicate
        );
        assert!(matches!(
            cli.plan("testfile2.test", &mut scheduled).unwrap(),
            Planned::Extract(_)
        ));
    }

    #[test]
    fn test_plan_existing_file() {
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("testfile.test"), "old").unwrap();

        let cli = cli_in(out.path(), &[]);
        assert_eq!(
            cli.plan("testfile.test", &mut HashSet::new()).unwrap(),
            Planned::SkipWithoutOverwrite
        );

        let cli = cli_in(out.path(), &["-n"]);
        assert_eq!(
            cli.plan("testfile.test", &mut HashSet::new()).unwrap(),
            Planned::SkipExisting
        );

        // -n wins over -o
        let cli = cli_in(out.path(), &["-n", "-o"]);
        assert_eq!(
            cli.plan("testfile.test", &mut HashSet::new()).unwrap(),
            Planned::SkipExisting
        );

        let cli = cli_in(out.path(), &["-o"]);
        assert_eq!(
            cli.plan("testfile.test", &mut HashSet::new()).unwrap(),
            Planned::Extract(out.path().join("testfile.test"))
        );
    }

    #[test]
    fn test_plan_skipped_names_stay_unscheduled() {
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("a"), "old").unwrap();
        let cli = cli_in(out.path(), &[]);
        let mut scheduled = HashSet::new();

        cli.plan("a", &mut scheduled).unwrap();
        assert!(scheduled.is_empty());
    }

    #[test]
    fn test_plan_unsafe_name() {
        let out = tempfile::tempdir().unwrap();
        let cli = cli_in(out.path(), &["-o"]);
        let err = cli.plan("../escape", &mut HashSet::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsafeName);
    }

    #[test]
    fn test_selects() {
        let cli = Cli::parse_from(["psfs", "a.dat", "*.test", "-x", "testfile2.test"]);
        assert!(cli.selects("testfile.test"));
        assert!(!cli.selects("testfile2.test"));
        assert!(!cli.selects("other.bin"));
    }

    #[test]
    fn test_selects_all_by_default() {
        let cli = Cli::parse_from(["psfs", "a.dat"]);
        assert!(cli.selects("anything"));
        assert_eq!(cli.jobs, 1);
        assert_eq!(cli.extract_dir, PathBuf::from("."));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(Cli::try_parse_from(["psfs", "a.dat", "-j", "0"]).is_err());
    }
}
