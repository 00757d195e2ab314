//! Command-line argument handling for the mirror binary.

use std::env;
use std::process;

pub const USAGE: &str = "\
cloudmirror - mirror a put.io tree into Google Drive

USAGE:
    cloudmirror [OPTIONS]

OPTIONS:
    --items <id,id,...>   put.io file/folder ids to mirror (default: tree root)
    --no-copy             skip copying content to the destination
    --delete              delete each source entry after it is processed
    -h, --help            print this help

ENVIRONMENT:
    PUTIO_TOKEN              put.io OAuth token
    DRIVE_CLIENT_ID          Google OAuth client id
    DRIVE_CLIENT_SECRET      Google OAuth client secret
    DRIVE_ACCESS_TOKEN       Google OAuth access token
    DRIVE_REFRESH_TOKEN      Google OAuth refresh token
    DRIVE_TOKEN_EXPIRY       access token expiry, RFC 3339 (optional)
    DRIVE_PARENT_FOLDER_ID   Drive folder receiving the mirrored tree
";

pub fn usage_and_exit(usage: &str) -> ! {
    eprintln!("{usage}");
    process::exit(1);
}

pub struct ArgParser {
    args: Vec<String>,
    usage: &'static str,
}

impl ArgParser {
    pub fn new(usage: &'static str) -> Self {
        let args: Vec<String> = env::args().skip(1).collect();

        if args.iter().any(|a| a == "--help" || a == "-h") {
            println!("{usage}");
            process::exit(0);
        }

        Self { args, usage }
    }

    #[cfg(test)]
    fn from_args(args: Vec<String>, usage: &'static str) -> Self {
        Self { args, usage }
    }

    pub fn take_flag(&mut self, names: &[&str]) -> bool {
        let before = self.args.len();
        self.args.retain(|a| !names.contains(&a.as_str()));
        self.args.len() != before
    }

    pub fn take_value(&mut self, names: &[&str]) -> Option<String> {
        let mut i = 0;
        while i < self.args.len() {
            if names.contains(&self.args[i].as_str()) {
                let value = self.args.get(i + 1).cloned();
                if value.is_none() {
                    usage_and_exit(self.usage);
                }
                self.args.drain(i..=i + 1);
                return value;
            }
            i += 1;
        }
        None
    }

    pub fn remaining(self) -> Vec<String> {
        self.args
    }
}

/// Parsed command line for the mirror binary.
#[derive(Debug, Clone)]
pub struct MirrorArgs {
    /// put.io ids to mirror; empty means the tree root
    pub items: Vec<String>,
    pub copy: bool,
    pub delete: bool,
}

impl MirrorArgs {
    /// Parse the process arguments, exiting on `--help` or unknown input.
    pub fn parse() -> Self {
        Self::from_parser(ArgParser::new(USAGE))
    }

    fn from_parser(mut parser: ArgParser) -> Self {
        let items = parser
            .take_value(&["--items"])
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let copy = !parser.take_flag(&["--no-copy"]);
        let delete = parser.take_flag(&["--delete"]);

        let usage = parser.usage;
        if !parser.remaining().is_empty() {
            usage_and_exit(usage);
        }

        Self {
            items,
            copy,
            delete,
        }
    }
}
