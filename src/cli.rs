use clap::Parser;
use std::path::PathBuf;

use crate::settings::SETTINGS;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Model variant: small | large
    pub size: String,

    /// Settings file (optional, defaults are used when missing)
    #[arg(long, default_value = SETTINGS)]
    pub settings: PathBuf,

    /// Overrides `host` from the settings file
    #[arg(long)]
    pub host: Option<String>,

    /// Overrides `port` from the settings file
    #[arg(long)]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_a_required_positional() {
        let args = Args::try_parse_from(["visual-search", "small", "--port", "9001"]).unwrap();
        assert_eq!(args.size, "small");
        assert_eq!(args.port, Some(9001));
        assert_eq!(args.settings, PathBuf::from(SETTINGS));
        assert!(Args::try_parse_from(["visual-search"]).is_err());
    }
}
