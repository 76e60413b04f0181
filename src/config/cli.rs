use crate::config::PortalConfig;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "libhub")]
#[command(about = "Command-line client for the LibraryHub backend")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override backend base URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Where the session token is stored
    #[arg(long, global = true)]
    pub session_file: Option<String>,

    /// Per-request timeout
    #[arg(long, global = true)]
    pub timeout_seconds: Option<u64>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create a student account, then enter the activation code
    Signup {
        #[arg(short, long)]
        username: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Profile picture to upload
        #[arg(long)]
        avatar: Option<PathBuf>,
        /// Paste the activation code instead of typing it interactively
        #[arg(long)]
        code: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Request a password-reset code, then verify it
    ForgotPassword {
        #[arg(short, long)]
        username: String,
        /// Paste the code instead of typing it interactively
        #[arg(long)]
        code: Option<String>,
    },
    /// Verify a one-time code
    Verify {
        /// Use the password-reset endpoint instead of account activation
        #[arg(long)]
        reset: bool,
        #[arg(long)]
        code: Option<String>,
    },
    /// Compute the fine for a due date
    Fine {
        #[arg(long)]
        due: String,
        /// Reference time, defaults to now
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        rate: Option<f64>,
    },
    /// List borrowed books with status and fines
    MyBooks,
    /// Return a borrowed book (by book id or loan id)
    Return { book_id: String },
    /// Admin: users with overdue books, as CSV
    OverdueReport {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl CliConfig {
    /// 讀取設定檔 (若有指定)，再套用命令列覆蓋
    pub fn resolve(&self) -> Result<PortalConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::debug!("📁 Loading configuration from: {}", path);
                PortalConfig::from_toml_file(path)?
            }
            None => PortalConfig::default(),
        };

        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(path) = &self.session_file {
            config.session_path = path.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Command::Fine {
            rate: Some(rate), ..
        } = &self.command
        {
            config.daily_rate = *rate;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;

    #[test]
    fn test_parse_verify_command() {
        let cli = CliConfig::parse_from(["libhub", "verify", "--reset", "--code", "1234"]);
        match cli.command {
            Command::Verify { reset, code } => {
                assert!(reset);
                assert_eq!(code.as_deref(), Some("1234"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_signup_and_return() {
        let cli = CliConfig::parse_from([
            "libhub", "signup", "-u", "alice", "--name", "Alice", "--email", "alice@example.com",
            "-p", "secret1", "--avatar", "me.png",
        ]);
        match cli.command {
            Command::Signup {
                username,
                avatar,
                code,
                ..
            } => {
                assert_eq!(username, "alice");
                assert_eq!(avatar, Some(PathBuf::from("me.png")));
                assert_eq!(code, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = CliConfig::parse_from(["libhub", "return", "b42"]);
        assert!(matches!(cli.command, Command::Return { ref book_id } if book_id == "b42"));
    }

    #[test]
    fn test_overrides_apply() {
        let cli = CliConfig::parse_from([
            "libhub",
            "--backend-url",
            "https://library.example.com",
            "--timeout-seconds",
            "3",
            "fine",
            "--due",
            "2024-01-01",
            "--rate",
            "1.5",
        ]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.backend_url, "https://library.example.com");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.daily_rate, 1.5);
        assert!(config.validate().is_ok());
    }
}
