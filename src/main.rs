use anyhow::{anyhow, Result};
use log::info;

/// Command line arguments structure
#[derive(Debug, Default)]
struct CommandArgs {
    verbose: bool,
    watch: bool,
    names: Vec<String>,
}

impl CommandArgs {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = CommandArgs::default();
        for arg in args {
            match arg.as_str() {
                "-v" | "--verbose" => parsed.verbose = true,
                "watch" => parsed.watch = true,
                "--help" | "-h" => {
                    return Err(anyhow!(
                        "usage: sheetcal [-v] [watch] [profile name ...]"
                    ));
                }
                other if other.starts_with('-') => {
                    return Err(anyhow!("Unknown flag: {}", other));
                }
                name => parsed.names.push(name.to_string()),
            }
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up calendar tokens from a local .env if one exists
    dotenvy::dotenv().ok();

    let args = CommandArgs::parse(std::env::args().skip(1))?;
    sheetcal::init_logger(args.verbose);

    info!("Starting sheetcal");
    if args.watch {
        sheetcal::watch(args.names.first().map(String::as_str)).await
    } else {
        sheetcal::run(&args.names).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CommandArgs {
        CommandArgs::parse(args.iter().map(|s| s.to_string())).unwrap()
    }

    #[test]
    fn parses_verbose_and_profile_names() {
        let args = parse(&["-v", "adam", "bri"]);
        assert!(args.verbose);
        assert!(!args.watch);
        assert_eq!(args.names, vec!["adam", "bri"]);
    }

    #[test]
    fn parses_watch_subcommand() {
        let args = parse(&["watch", "adam"]);
        assert!(args.watch);
        assert_eq!(args.names, vec!["adam"]);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(CommandArgs::parse(["--bogus".to_string()].into_iter()).is_err());
    }
}
