//! Listing output for `--list-aliases` and `--list-available-options`

use clap::Command;
use scuba_core::config::ScubaConfig;

/// Tab-separated alias table, sorted by alias name
///
/// The image column falls back to the top-level image.
pub fn format_aliases(config: &ScubaConfig) -> String {
    let mut names: Vec<&String> = config.aliases.keys().collect();
    names.sort();

    let mut out = String::from("ALIAS\tIMAGE\n");
    for name in names {
        let alias = &config.aliases[name];
        let image = alias
            .image
            .as_deref()
            .or(config.image_opt())
            .unwrap_or("");
        out.push_str(&format!("{}\t{}\n", alias.name, image));
    }
    out
}

/// Visible options of `cmd`, long form preferred, sorted by name
pub fn available_options(cmd: &Command) -> Vec<String> {
    let mut cmd = cmd.clone();
    cmd.build();

    let mut opts: Vec<String> = cmd
        .get_arguments()
        .filter(|a| !a.is_hide_set() && !a.is_positional())
        .filter_map(|a| match (a.get_long(), a.get_short()) {
            (Some(long), _) => Some(format!("--{}", long)),
            (None, Some(short)) => Some(format!("-{}", short)),
            (None, None) => None,
        })
        .collect();
    opts.sort_by(|a, b| a.trim_start_matches('-').cmp(b.trim_start_matches('-')));
    opts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::CommandFactory;

    fn config(text: &str) -> ScubaConfig {
        let doc: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
        ScubaConfig::from_value(&doc, None).unwrap()
    }

    #[test]
    fn test_format_aliases() {
        let cfg = config(
            "image: top\naliases:\n  zeta: ls\n  alpha:\n    image: other\n    script: ls\n",
        );
        assert_eq!(
            format_aliases(&cfg),
            "ALIAS\tIMAGE\nalpha\tother\nzeta\ttop\n"
        );
    }

    #[test]
    fn test_format_aliases_without_image() {
        let cfg = config("aliases:\n  build: make\n");
        assert_eq!(format_aliases(&cfg), "ALIAS\tIMAGE\nbuild\t\n");
    }

    #[test]
    fn test_available_options() {
        let opts = available_options(&Cli::command());
        assert_eq!(
            opts,
            vec![
                "--docker-arg",
                "--dry-run",
                "--entrypoint",
                "--env",
                "--help",
                "--image",
                "--keep-tempfiles",
                "--root",
                "--shell",
                "--verbose",
                "--version",
            ]
        );
    }
}
