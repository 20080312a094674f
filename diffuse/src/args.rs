use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Text-to-image generation service with an MCP adapter
#[derive(Debug, Parser)]
#[command(name = "diffuse", about = "Text-to-image generation service with an MCP adapter")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "diffuse.toml", env = "DIFFUSE_CONFIG")]
    pub config: PathBuf,

    /// Log filter directive, e.g. `info` or `diffuse_imagegen=debug`
    #[arg(long, global = true, default_value = "info", env = "DIFFUSE_LOG")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the image service
    ImageService {
        /// Detach from the terminal and log to the daemon log file
        #[arg(long)]
        daemon: bool,

        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory generated images are written to
        #[arg(long, env = "IMAGE_GEN_DIR")]
        images_dir: Option<PathBuf>,
    },

    /// Run the HTTP protocol adapter
    Adapter {
        /// Listen port; unparsable values fall back to 6000
        port: Option<String>,
    },

    /// Run the image service on a background thread and the adapter in front
    /// of it
    Combined {
        /// Speak MCP over stdin/stdout instead of serving HTTP
        #[arg(long)]
        stdio: bool,

        /// Directory generated images are written to
        #[arg(long, env = "IMAGE_GEN_DIR")]
        images_dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        temp_env::with_vars_unset(["DIFFUSE_CONFIG", "DIFFUSE_LOG", "IMAGE_GEN_DIR"], || {
            Args::try_parse_from(args).unwrap()
        })
    }

    #[test]
    fn defaults() {
        let args = parse(&["diffuse", "adapter"]);

        assert_eq!(args.config, PathBuf::from("diffuse.toml"));
        assert_eq!(args.log_filter, "info");
        assert!(matches!(args.command, Command::Adapter { port: None }));
    }

    #[test]
    fn image_service_flags() {
        let args = parse(&["diffuse", "image-service", "--daemon", "--port", "5100"]);

        let Command::ImageService {
            daemon,
            port,
            images_dir,
        } = args.command
        else {
            panic!("expected image-service");
        };
        assert!(daemon);
        assert_eq!(port, Some(5100));
        assert!(images_dir.is_none());
    }

    #[test]
    fn adapter_port_is_kept_raw() {
        let args = parse(&["diffuse", "adapter", "not-a-port"]);
        assert!(matches!(args.command, Command::Adapter { port: Some(ref p) } if p == "not-a-port"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = parse(&["diffuse", "combined", "--stdio", "--config", "/etc/diffuse.toml"]);

        assert_eq!(args.config, PathBuf::from("/etc/diffuse.toml"));
        assert!(matches!(args.command, Command::Combined { stdio: true, .. }));
    }

    #[test]
    fn images_dir_from_environment() {
        let args = temp_env::with_var("IMAGE_GEN_DIR", Some("/srv/images"), || {
            Args::try_parse_from(["diffuse", "combined"]).unwrap()
        });

        let Command::Combined { images_dir, .. } = args.command else {
            panic!("expected combined");
        };
        assert_eq!(images_dir, Some(PathBuf::from("/srv/images")));
    }

    #[test]
    fn config_from_environment() {
        let args = temp_env::with_vars(
            [("DIFFUSE_CONFIG", Some("/tmp/other.toml")), ("DIFFUSE_LOG", Some("debug"))],
            || Args::try_parse_from(["diffuse", "adapter"]).unwrap(),
        );

        assert_eq!(args.config, PathBuf::from("/tmp/other.toml"));
        assert_eq!(args.log_filter, "debug");
    }
}
